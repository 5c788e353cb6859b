use serde::{Deserialize, Serialize};

use crate::{
    error::{BalanceError, LedgerError, ValidationError},
    model::{DateRange, Expense, ExpenseId, Member, MemberBalances, MemberSet},
    services::{BalanceCalculator, SettlementContext},
};

/// Members and recorded expenses of one group.
///
/// The ledger stores data only; balances are recomputed from it on every query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    members: MemberSet,
    expenses: Vec<Expense>,
    #[serde(default)]
    context: SettlementContext,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: SettlementContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    pub fn context(&self) -> SettlementContext {
        self.context
    }

    pub fn members(&self) -> &MemberSet {
        &self.members
    }

    pub fn contains_member(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn expense(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|expense| expense.id() == id)
    }

    /// Adds `name` as a new member. Names are compared exactly, so "alice" and "Alice" differ.
    pub fn add_member(&mut self, name: &str) -> Result<Member, LedgerError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyMemberName.into());
        }
        if let Some(existing) = self.members.get(name) {
            return Err(LedgerError::DuplicateMember(existing.clone()));
        }

        let member = Member::from(name);
        self.members.insert(member.clone());
        Ok(member)
    }

    /// Validates and appends `expense`. On error the ledger is left unchanged.
    pub fn add_expense(&mut self, expense: Expense) -> Result<ExpenseId, LedgerError> {
        if self.expense(expense.id()).is_some() {
            return Err(ValidationError::DuplicateExpense { id: expense.id() }.into());
        }
        expense.validate(&self.members, self.context)?;

        let id = expense.id();
        tracing::debug!(
            expense_id = %id,
            line_count = expense.lines().len(),
            total = ?expense.total(),
            "Expense recorded"
        );
        self.expenses.push(expense);
        Ok(id)
    }

    /// Removes the expense with `id`; unknown ids are ignored.
    pub fn remove_expense(&mut self, id: ExpenseId) -> Option<Expense> {
        let position = self.expenses.iter().position(|expense| expense.id() == id)?;
        Some(self.expenses.remove(position))
    }

    /// Expenses dated inside `range`, plus every undated expense, in recording order.
    pub fn expenses_in_range<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> impl Iterator<Item = &'a Expense> + 'a {
        self.expenses
            .iter()
            .filter(move |expense| range.contains(expense.date()))
    }

    pub fn balances(&self, range: Option<&DateRange>) -> Result<MemberBalances, BalanceError> {
        BalanceCalculator::calculate(self, range)
    }
}
