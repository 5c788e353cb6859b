use crate::{
    error::ValidationError,
    model::{Expense, Member, MemberBalances, MemberSet, Money, ShareLine, Split},
    services::SettlementContext,
};
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Per-participant shares of one line, with the payer they are owed to.
#[derive(Debug, Clone, PartialEq)]
pub struct LineAllocation<'a> {
    pub payer: &'a Member,
    pub shares: MemberBalances,
    /// What the payer is credited: exactly the sum of the shares.
    pub credited: Money,
}

/// Turns share lines into concrete per-participant amounts.
pub struct ShareAllocator {
    context: SettlementContext,
}

impl ShareAllocator {
    pub fn new(context: SettlementContext) -> Self {
        Self { context }
    }

    /// Validates every line of `expense` against `members` and computes its shares.
    pub fn allocate_expense<'a>(
        &self,
        expense: &'a Expense,
        members: &MemberSet,
    ) -> Result<Vec<LineAllocation<'a>>, ValidationError> {
        if expense.lines().is_empty() {
            return Err(ValidationError::NoLines);
        }

        expense
            .lines()
            .iter()
            .enumerate()
            .map(|(idx, share_line)| {
                let line = idx + 1;
                if let Some(member) = share_line
                    .referenced_members()
                    .find(|member| !members.contains(*member))
                {
                    return Err(ValidationError::UnknownMember {
                        line,
                        member: member.clone(),
                    });
                }
                let shares = self.allocate(line, share_line)?;
                let credited = Money::checked_sum(shares.values().copied())
                    .ok_or(ValidationError::AmountOverflow { line })?;
                Ok(LineAllocation {
                    payer: share_line.payer(),
                    shares,
                    credited,
                })
            })
            .collect()
    }

    pub fn allocate(
        &self,
        line: usize,
        share_line: &ShareLine,
    ) -> Result<MemberBalances, ValidationError> {
        let amount = share_line.amount();
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount { line, amount });
        }
        if share_line.split().participant_count() == 0 {
            return Err(ValidationError::EmptyParticipants { line });
        }

        match share_line.split() {
            Split::Equal(participants) => self.equal(line, amount, participants),
            Split::Exact(shares) => self.exact(line, amount, shares),
            Split::Percent(percentages) => self.percent(line, amount, percentages),
        }
    }

    fn equal(
        &self,
        line: usize,
        amount: Money,
        participants: &MemberSet,
    ) -> Result<MemberBalances, ValidationError> {
        let total_units = self.units_of(line, amount)?;
        let count = participants.len() as i64;
        let base = total_units / count;
        let remainder = (total_units % count) as usize;

        participants
            .iter()
            .enumerate()
            .map(|(idx, member)| {
                let mut units = base;
                if idx < remainder {
                    units += 1;
                }
                self.money_of(line, amount, units)
                    .map(|share| (member.clone(), share))
            })
            .collect()
    }

    fn exact(
        &self,
        line: usize,
        amount: Money,
        shares: &IndexMap<Member, Money, FxBuildHasher>,
    ) -> Result<MemberBalances, ValidationError> {
        if let Some((member, share)) = shares.iter().find(|(_, share)| share.is_negative()) {
            return Err(ValidationError::NegativeShare {
                line,
                member: member.clone(),
                share: share.as_decimal(),
            });
        }

        let actual = Money::checked_sum(shares.values().copied())
            .ok_or(ValidationError::AmountOverflow { line })?;
        let discrepancy = actual
            .checked_sub(amount)
            .ok_or(ValidationError::AmountOverflow { line })?
            .abs()
            .as_decimal();
        if discrepancy > self.context.split_tolerance {
            return Err(ValidationError::ShareMismatch {
                line,
                expected: amount,
                actual,
            });
        }
        if !discrepancy.is_zero() {
            tracing::warn!(
                line,
                expected = %amount,
                actual = %actual,
                tolerance = %self.context.split_tolerance,
                "Explicit shares differ from the line amount; crediting the share total"
            );
        }

        Ok(shares
            .iter()
            .map(|(member, share)| (member.clone(), *share))
            .collect())
    }

    fn percent(
        &self,
        line: usize,
        amount: Money,
        percentages: &IndexMap<Member, Decimal, FxBuildHasher>,
    ) -> Result<MemberBalances, ValidationError> {
        if let Some((member, pct)) = percentages.iter().find(|(_, pct)| **pct < Decimal::ZERO) {
            return Err(ValidationError::NegativeShare {
                line,
                member: member.clone(),
                share: *pct,
            });
        }

        let hundred = Decimal::ONE_HUNDRED;
        let total = percentages
            .values()
            .try_fold(Decimal::ZERO, |acc, pct| acc.checked_add(*pct))
            .ok_or(ValidationError::AmountOverflow { line })?;
        if (total - hundred).abs() > self.context.split_tolerance {
            return Err(ValidationError::PercentageMismatch { line, total });
        }
        if total != hundred {
            tracing::warn!(
                line,
                total = %total,
                tolerance = %self.context.split_tolerance,
                "Percentages differ from 100; distributing the whole line amount"
            );
        }

        let total_units = self.units_of(line, amount)?;
        let mut units: Vec<i64> = percentages
            .values()
            .map(|pct| {
                (Decimal::from(total_units) * *pct / hundred)
                    .trunc()
                    .to_i64()
                    .ok_or(ValidationError::UnrepresentableAmount {
                        line,
                        amount,
                        scale: self.context.scale,
                    })
            })
            .collect::<Result<_, _>>()?;

        // Hand leftover units out one at a time in participant order. When the
        // percentages overshoot 100 the residual is negative and empty shares are skipped.
        let mut residual = total_units - units.iter().sum::<i64>();
        let step = residual.signum();
        let mut idx = 0;
        while residual != 0 {
            let slot = idx % units.len();
            if step > 0 || units[slot] > 0 {
                units[slot] += step;
                residual -= step;
            }
            idx += 1;
        }

        percentages
            .keys()
            .zip(units)
            .map(|(member, units)| {
                self.money_of(line, amount, units)
                    .map(|share| (member.clone(), share))
            })
            .collect()
    }

    fn units_of(&self, line: usize, amount: Money) -> Result<i64, ValidationError> {
        self.context
            .to_atomic_units(amount)
            .ok_or(ValidationError::UnrepresentableAmount {
                line,
                amount,
                scale: self.context.scale,
            })
    }

    fn money_of(&self, line: usize, amount: Money, units: i64) -> Result<Money, ValidationError> {
        self.context
            .from_atomic_units(units)
            .ok_or(ValidationError::UnrepresentableAmount {
                line,
                amount,
                scale: self.context.scale,
            })
    }
}
