use crate::{
    error::SettlementError,
    model::{Member, MemberBalances, Money, SettlementInstruction},
    services::{SettlementContext, SettlementRoundingError, quantize_balances},
};
use rust_decimal::Decimal;

/// Greedy cash-flow settlement.
///
/// Every round pairs the largest outstanding creditor with the largest
/// outstanding debtor and moves the smaller of the two amounts. Both sides are
/// re-selected each round; exact ties go to whoever comes first in the input.
/// This bounds the output to `creditors + debtors - 1` instructions but does
/// not guarantee the minimum number of transfers.
pub struct SettlementCalculator {
    epsilon: Decimal,
}

impl SettlementCalculator {
    pub fn new(context: &SettlementContext) -> Self {
        Self {
            epsilon: context.epsilon.abs(),
        }
    }

    /// Calculate the transfers that bring every balance back to zero.
    ///
    /// # Arguments
    /// * `balances` - Net position per member (positive: is owed money)
    ///
    /// # Returns
    /// Ordered instructions, or `UnbalancedLedger` when the balances do not sum to zero.
    ///
    /// Balances are expected in whole atomic units, as produced by
    /// [`quantize_balances`]. Sub-epsilon remainders are dropped per member, so
    /// unquantized input can leave one side unmatched.
    pub fn calculate(
        &self,
        balances: &MemberBalances,
    ) -> Result<Vec<SettlementInstruction>, SettlementError> {
        let mut creditors: Vec<(Member, Decimal)> = Vec::new();
        let mut debtors: Vec<(Member, Decimal)> = Vec::new();
        for (member, balance) in balances {
            let balance = balance.as_decimal();
            if balance > self.epsilon {
                creditors.push((member.clone(), balance));
            } else if balance < -self.epsilon {
                debtors.push((member.clone(), -balance));
            }
        }

        let mut instructions = Vec::with_capacity((creditors.len() + debtors.len()).saturating_sub(1));

        while !creditors.is_empty() && !debtors.is_empty() {
            let creditor_idx = position_of_largest(&creditors);
            let debtor_idx = position_of_largest(&debtors);

            let payment = creditors[creditor_idx].1.min(debtors[debtor_idx].1);
            instructions.push(SettlementInstruction {
                debtor: debtors[debtor_idx].0.clone(),
                creditor: creditors[creditor_idx].0.clone(),
                amount: Money::from_decimal(payment),
            });

            creditors[creditor_idx].1 -= payment;
            debtors[debtor_idx].1 -= payment;
            if creditors[creditor_idx].1 <= self.epsilon {
                creditors.remove(creditor_idx);
            }
            if debtors[debtor_idx].1 <= self.epsilon {
                debtors.remove(debtor_idx);
            }
        }

        if !creditors.is_empty() || !debtors.is_empty() {
            let unmatched: Vec<(Member, Money)> = creditors
                .into_iter()
                .map(|(member, amount)| (member, Money::from_decimal(amount)))
                .chain(
                    debtors
                        .into_iter()
                        .map(|(member, amount)| (member, Money::from_decimal(-amount))),
                )
                .collect();
            let residual = Money::from_decimal(
                unmatched
                    .iter()
                    .fold(Decimal::ZERO, |acc, (_, amount)| acc.saturating_add(amount.as_decimal())),
            );
            tracing::error!(
                residual = %residual,
                unmatched_count = unmatched.len(),
                emitted = instructions.len(),
                "Settlement aborted: balances do not sum to zero"
            );
            return Err(SettlementError::UnbalancedLedger {
                residual,
                unmatched,
            });
        }

        tracing::debug!(
            member_count = balances.len(),
            instruction_count = instructions.len(),
            "Settlement computed"
        );
        Ok(instructions)
    }
}

/// Settles `balances` at the default (cent) scale.
///
/// Balances are quantized to whole cents first. Input that does not sum to zero
/// is settled as given and reported as [`SettlementError::UnbalancedLedger`].
pub fn compute_settlements(
    balances: &MemberBalances,
) -> Result<Vec<SettlementInstruction>, SettlementError> {
    let context = SettlementContext::default();
    let calculator = SettlementCalculator::new(&context);
    match quantize_balances(balances, context) {
        Ok(quantized) => calculator.calculate(&quantized),
        Err(SettlementRoundingError::ImbalancedTotal(_)) => calculator.calculate(balances),
        Err(err) => Err(err.into()),
    }
}

// First maximum wins.
fn position_of_largest(entries: &[(Member, Decimal)]) -> usize {
    let mut best = 0;
    for (idx, (_, amount)) in entries.iter().enumerate().skip(1) {
        if *amount > entries[best].1 {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn calculator() -> SettlementCalculator {
        SettlementCalculator::new(&SettlementContext::cents())
    }

    fn balances(entries: &[(&str, i64)]) -> MemberBalances {
        entries
            .iter()
            .map(|(name, cents)| (Member::from(*name), Money::new(*cents, 2)))
            .collect()
    }

    #[rstest]
    #[case::one_creditor_two_debtors(
        &[("Alice", 6000), ("Bob", -3000), ("Carol", -3000)],
        vec![("Bob", "Alice", 3000), ("Carol", "Alice", 3000)]
    )]
    #[case::all_zero(&[("A", 0), ("B", 0)], vec![])]
    #[case::empty(&[], vec![])]
    #[case::largest_debtor_first(
        &[("A", 5000), ("B", -1000), ("C", -4000)],
        vec![("C", "A", 4000), ("B", "A", 1000)]
    )]
    #[case::reselects_every_round(
        // After C pays A 60, B (40) outranks A (20) and receives D's next payment.
        &[("A", 8000), ("B", 4000), ("C", -6000), ("D", -6000)],
        vec![("C", "A", 6000), ("D", "B", 4000), ("D", "A", 2000)]
    )]
    #[case::tie_between_creditors_goes_to_first(
        &[("B", 1000), ("A", 1000), ("C", -2000)],
        vec![("C", "B", 1000), ("C", "A", 1000)]
    )]
    #[case::tie_between_debtors_goes_to_first(
        &[("X", -1500), ("Y", -1500), ("Z", 3000)],
        vec![("X", "Z", 1500), ("Y", "Z", 1500)]
    )]
    #[case::two_people(
        &[("A", 1000), ("B", -1000)],
        vec![("B", "A", 1000)]
    )]
    fn settlement_calculator_cases(
        calculator: SettlementCalculator,
        #[case] input: &[(&str, i64)],
        #[case] expected: Vec<(&str, &str, i64)>,
    ) {
        let instructions = calculator.calculate(&balances(input)).unwrap();

        let expected: Vec<SettlementInstruction> = expected
            .into_iter()
            .map(|(debtor, creditor, cents)| SettlementInstruction {
                debtor: Member::from(debtor),
                creditor: Member::from(creditor),
                amount: Money::new(cents, 2),
            })
            .collect();
        assert_eq!(instructions, expected);
    }

    #[rstest]
    fn near_zero_members_are_omitted(calculator: SettlementCalculator) {
        let mut input = balances(&[("A", 1000), ("B", -1000)]);
        input.insert(Member::from("dust"), Money::new(4, 3));
        input.insert(Member::from("A"), Money::new(9996, 3));

        let instructions = calculator.calculate(&input).unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].debtor, Member::from("B"));
        assert_eq!(instructions[0].amount, Money::new(9996, 3));
    }

    #[rstest]
    #[case::creditor_left(&[("A", 5000), ("B", -3000)], 2000)]
    #[case::debtor_left(&[("A", 1000), ("B", -3000), ("C", -1000)], -3000)]
    #[case::only_creditors(&[("A", 100)], 100)]
    fn unbalanced_input_is_rejected(
        calculator: SettlementCalculator,
        #[case] input: &[(&str, i64)],
        #[case] residual_cents: i64,
    ) {
        match calculator.calculate(&balances(input)) {
            Err(SettlementError::UnbalancedLedger { residual, unmatched }) => {
                assert_eq!(residual, Money::new(residual_cents, 2));
                assert!(!unmatched.is_empty());
            }
            other => panic!("expected unbalanced ledger error, got {other:?}"),
        }
    }

    #[test]
    fn sub_cent_balances_are_quantized_before_settling() {
        let input: MemberBalances = [("X", 8), ("Y", -4), ("Z", -4)]
            .into_iter()
            .map(|(name, mills)| (Member::from(name), Money::new(mills, 3)))
            .collect();
        assert!(matches!(
            SettlementCalculator::new(&SettlementContext::cents()).calculate(&input),
            Err(SettlementError::UnbalancedLedger { .. })
        ));

        // X rounds up to 0.01; Y gained most from rounding to 0.00 and gives the cent back.
        let instructions = compute_settlements(&input).unwrap();
        assert_eq!(
            instructions,
            vec![SettlementInstruction {
                debtor: Member::from("Y"),
                creditor: Member::from("X"),
                amount: Money::new(1, 2),
            }]
        );
    }

    #[test]
    fn compute_settlements_still_reports_unbalanced_input() {
        assert!(matches!(
            compute_settlements(&balances(&[("A", 5000), ("B", -3000)])),
            Err(SettlementError::UnbalancedLedger { .. })
        ));
    }

    #[rstest]
    fn applying_instructions_zeroes_balances(calculator: SettlementCalculator) {
        let input = balances(&[("A", 1234), ("B", -999), ("C", 4321), ("D", -4556)]);
        let instructions = calculator.calculate(&input).unwrap();

        let mut settled = input.clone();
        for instruction in &instructions {
            instruction.apply_to(&mut settled);
        }
        assert!(settled.values().all(|money| money.is_zero()));
        assert!(instructions.len() <= 3);
    }
}
