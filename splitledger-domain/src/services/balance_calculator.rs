use crate::{
    error::BalanceError,
    ledger::Ledger,
    model::{DateRange, Expense, MemberBalances, MemberSet, Money},
    services::{SettlementContext, ShareAllocator},
};

/// Running net positions, one entry per member from the start.
pub struct BalanceAccumulator<'a> {
    balances: MemberBalances,
    members: &'a MemberSet,
    allocator: ShareAllocator,
}

impl<'a> BalanceAccumulator<'a> {
    pub fn new(members: &'a MemberSet, context: SettlementContext) -> Self {
        let balances = members
            .iter()
            .cloned()
            .map(|member| (member, Money::ZERO))
            .collect();

        Self {
            balances,
            members,
            allocator: ShareAllocator::new(context),
        }
    }

    /// Debits each participant's share and credits the payer with the share total.
    ///
    /// A rejected expense, including one that would push a balance out of the
    /// decimal range, leaves the accumulator untouched.
    pub fn apply(&mut self, expense: &Expense) -> Result<(), BalanceError> {
        let allocations = self
            .allocator
            .allocate_expense(expense, self.members)
            .map_err(|source| BalanceError::InvalidExpense {
                expense: expense.id(),
                source,
            })?;

        let overflow = || BalanceError::BalanceOverflow {
            expense: expense.id(),
        };
        let mut staged = self.balances.clone();
        for allocation in &allocations {
            for (participant, share) in &allocation.shares {
                let balance = staged.entry(participant.clone()).or_insert(Money::ZERO);
                *balance = balance.checked_sub(*share).ok_or_else(overflow)?;
            }
            let balance = staged
                .entry(allocation.payer.clone())
                .or_insert(Money::ZERO);
            *balance = balance
                .checked_add(allocation.credited)
                .ok_or_else(overflow)?;
        }
        self.balances = staged;
        Ok(())
    }

    pub fn balances(&self) -> &MemberBalances {
        &self.balances
    }

    pub fn into_balances(self) -> MemberBalances {
        self.balances
    }
}

/// Balance aggregation over a ledger snapshot.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Net position of every member over the expenses inside `range` (all when `None`).
    pub fn calculate(
        ledger: &Ledger,
        range: Option<&DateRange>,
    ) -> Result<MemberBalances, BalanceError> {
        let range = range.copied().unwrap_or_default();
        let mut accumulator = BalanceAccumulator::new(ledger.members(), ledger.context());
        let mut applied = 0usize;
        for expense in ledger.expenses_in_range(&range) {
            accumulator.apply(expense)?;
            applied += 1;
        }

        let balances = accumulator.into_balances();
        tracing::debug!(
            member_count = balances.len(),
            expense_count = applied,
            range = %range,
            "Balances computed"
        );
        Ok(balances)
    }
}

/// Net position of every member; see [`BalanceCalculator::calculate`].
pub fn compute_balances(
    ledger: &Ledger,
    range: Option<&DateRange>,
) -> Result<MemberBalances, BalanceError> {
    BalanceCalculator::calculate(ledger, range)
}
