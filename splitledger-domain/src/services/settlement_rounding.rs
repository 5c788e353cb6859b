//! Zero-sum quantization of balances to the atomic unit.
//!
//! Balances built from explicit or percentage shares may carry more decimal
//! places than the currency allows. Before settling, each balance is rounded
//! to the context scale and the rounding surplus (or deficit) is handed back
//! one atomic unit at a time, so the quantized balances still sum to exactly
//! zero.

use crate::model::{MemberBalances, Money};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rounding mode for settlement quantization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingMode {
    /// Round half away from zero (e.g., 0.005 -> 0.01, -0.005 -> -0.01).
    #[default]
    HalfUp,
    /// Round half to nearest even number (banker's rounding).
    HalfEven,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

/// Numeric policy shared by share allocation, quantization and settlement.
///
/// # Example
/// ```
/// use splitledger_domain::services::{RoundingMode, SettlementContext};
///
/// let ctx = SettlementContext::with_scale(0).unwrap(); // JPY
/// assert_eq!(ctx.rounding_mode, RoundingMode::HalfUp);
/// assert_eq!(ctx.atomic_unit(), rust_decimal::Decimal::ONE);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementContext {
    /// Number of decimal places of the atomic unit (2 for cents, 0 for JPY).
    pub scale: u32,
    pub rounding_mode: RoundingMode,
    /// Allowed gap between explicit shares (or percentages) and their expected total.
    pub split_tolerance: Decimal,
    /// Amounts at or below this magnitude count as settled.
    pub epsilon: Decimal,
}

impl Default for SettlementContext {
    fn default() -> Self {
        Self::cents()
    }
}

impl SettlementContext {
    pub fn cents() -> Self {
        Self {
            scale: 2,
            rounding_mode: RoundingMode::HalfUp,
            split_tolerance: Decimal::new(1, 2),
            epsilon: Decimal::new(5, 3),
        }
    }

    /// Tolerance of one atomic unit, epsilon of half a unit.
    pub fn with_scale(scale: u32) -> Result<Self, SettlementRoundingError> {
        validate_scale(scale)?;
        Ok(Self {
            scale,
            rounding_mode: RoundingMode::HalfUp,
            split_tolerance: Decimal::new(1, scale),
            epsilon: Decimal::new(5, scale + 1),
        })
    }

    pub fn atomic_unit(self) -> Decimal {
        Decimal::new(1, self.scale.min(MAX_SETTLEMENT_SCALE))
    }

    /// Converts a money amount to integer atomic units under this context scale.
    pub fn to_atomic_units(self, amount: Money) -> Option<i64> {
        if self.scale > MAX_SETTLEMENT_SCALE {
            return None;
        }
        let factor = Decimal::from_i128_with_scale(10_i128.checked_pow(self.scale)?, 0);
        let units = amount.as_decimal().checked_mul(factor)?;
        if units.fract() != Decimal::ZERO {
            return None;
        }
        units.to_i64()
    }

    pub fn from_atomic_units(self, units: i64) -> Option<Money> {
        Decimal::try_new(units, self.scale).ok().map(Money::from_decimal)
    }

    pub fn is_negligible(self, amount: Decimal) -> bool {
        amount.abs() <= self.epsilon
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SettlementRoundingError {
    /// The total of the balances is further from zero than epsilon allows.
    #[error("balances sum to {0}, expected zero")]
    ImbalancedTotal(Money),
    #[error("rounding adjustment count is out of range")]
    InvalidAdjustmentCount,
    #[error("quantized balances failed to restore zero-sum")]
    ZeroSumInvariantViolation,
    #[error("scale {scale} is not supported (max {max_supported})")]
    UnsupportedScale { scale: u32, max_supported: u32 },
    #[error("balance total exceeds the representable range")]
    AmountOverflow,
}

const MAX_SETTLEMENT_SCALE: u32 = 22;

/// Rounds every balance to the context scale, keeping the total at zero.
///
/// Adjustment candidates are ranked by how much they gained from rounding:
/// - total too high: larger `rounded - original` gives back a unit first
/// - total too low: smaller `rounded - original` receives a unit first
///
/// Exact ties go to the member that comes first in `balances`.
///
/// # Example
/// ```
/// use splitledger_domain::{Member, MemberBalances, Money};
/// use splitledger_domain::services::{SettlementContext, quantize_balances};
///
/// let balances: MemberBalances = [
///     (Member::from("A"), Money::new(66_667, 3)),
///     (Member::from("B"), Money::new(-33_333, 3)),
///     (Member::from("C"), Money::new(-33_334, 3)),
/// ]
/// .into_iter()
/// .collect();
///
/// let rounded = quantize_balances(&balances, SettlementContext::cents()).unwrap();
/// assert!(rounded.values().copied().sum::<Money>().is_zero());
/// ```
pub fn quantize_balances(
    balances: &MemberBalances,
    context: SettlementContext,
) -> Result<MemberBalances, SettlementRoundingError> {
    validate_scale(context.scale)?;
    let atomic_unit = context.atomic_unit();
    let original_sum = Money::checked_sum(balances.values().copied())
        .ok_or(SettlementRoundingError::AmountOverflow)?;
    if !context.is_negligible(original_sum.as_decimal()) {
        tracing::error!(
            reject_reason = "input_imbalance",
            member_count = balances.len(),
            atomic_unit = %atomic_unit,
            epsilon = %context.epsilon,
            sum_original = %original_sum,
            "Settlement quantization rejected due to input imbalance"
        );
        return Err(SettlementRoundingError::ImbalancedTotal(original_sum));
    }

    let strategy = context.rounding_mode.strategy();

    // (original, units, diff)
    let mut entries: Vec<(Decimal, i128, Decimal)> = balances
        .values()
        .map(|money| {
            let original = money.as_decimal();
            let units = quantize_to_int(original, atomic_unit, strategy)?;
            let diff = Decimal::from(units) * atomic_unit - original;
            Ok((original, units, diff))
        })
        .collect::<Result<Vec<_>, SettlementRoundingError>>()?;

    let v_int = sum_units(&entries)?;

    if v_int != 0 {
        let adjustment_count = usize::try_from(v_int.unsigned_abs())
            .map_err(|_| SettlementRoundingError::InvalidAdjustmentCount)?;

        if adjustment_count > entries.len() {
            tracing::error!(
                reject_reason = "k_gt_n",
                v_int,
                adjustment_count,
                member_count = balances.len(),
                "Adjustment count exceeds participant count during settlement quantization"
            );
            return Err(SettlementRoundingError::InvalidAdjustmentCount);
        }

        let score_sign = if v_int > 0 {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        let mut ranked: Vec<(usize, Decimal)> = entries
            .iter()
            .enumerate()
            .map(|(idx, (_, _, diff))| (idx, *diff * score_sign))
            .collect();
        ranked.sort_by(|(idx_a, score_a), (idx_b, score_b)| {
            score_b.cmp(score_a).then_with(|| idx_a.cmp(idx_b))
        });

        let adjustment: i128 = if v_int > 0 { -1 } else { 1 };
        for (idx, _) in ranked.iter().take(adjustment_count) {
            entries[*idx].1 += adjustment;
        }

        tracing::debug!(
            v_int,
            adjustment_count,
            member_count = balances.len(),
            sum_original = %original_sum,
            "Settlement quantization repaired rounding surplus"
        );

        let repaired = sum_units(&entries)?;
        if repaired != 0 {
            tracing::error!(
                reject_reason = "zero_sum_invariant_violation",
                member_count = balances.len(),
                v_int = repaired,
                "Settlement quantization failed zero-sum invariant check"
            );
            return Err(SettlementRoundingError::ZeroSumInvariantViolation);
        }
    }

    Ok(balances
        .keys()
        .cloned()
        .zip(entries)
        .map(|(member, (_, units, _))| {
            (member, Money::from_decimal(Decimal::from(units) * atomic_unit))
        })
        .collect())
}

fn sum_units(entries: &[(Decimal, i128, Decimal)]) -> Result<i128, SettlementRoundingError> {
    entries.iter().try_fold(0_i128, |acc, (_, units, _)| {
        acc.checked_add(*units)
            .ok_or(SettlementRoundingError::InvalidAdjustmentCount)
    })
}

fn validate_scale(scale: u32) -> Result<(), SettlementRoundingError> {
    if scale <= MAX_SETTLEMENT_SCALE {
        return Ok(());
    }
    Err(SettlementRoundingError::UnsupportedScale {
        scale,
        max_supported: MAX_SETTLEMENT_SCALE,
    })
}

fn quantize_to_int(
    original: Decimal,
    atomic_unit: Decimal,
    strategy: RoundingStrategy,
) -> Result<i128, SettlementRoundingError> {
    let q_decimal = (original / atomic_unit).round_dp_with_strategy(0, strategy);
    let Some(q_i) = q_decimal.to_i128() else {
        tracing::warn!(
            reject_reason = "quantize_failure",
            original = %original,
            atomic_unit = %atomic_unit,
            rounded_units = %q_decimal,
            "Quantization unit conversion failed"
        );
        return Err(SettlementRoundingError::InvalidAdjustmentCount);
    };
    Ok(q_i)
}
