use std::sync::Arc;

use parking_lot::Mutex;
use splitledger_domain::{DateRange, Expense, ExpenseId, Ledger, LedgerError, Member};

use crate::{error::ReportError, model::SettlementReport, report::build_report};

/// A ledger shared between threads. Clones refer to the same ledger.
///
/// Every mutation and every report holds the lock for its whole duration, so a
/// report never observes a half-applied change.
#[derive(Clone, Debug, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn add_member(&self, name: &str) -> Result<Member, LedgerError> {
        let result = self.inner.lock().add_member(name);
        if let Err(err) = &result {
            tracing::warn!(member = name, error = %err, "Member rejected");
        }
        result
    }

    pub fn add_expense(&self, expense: Expense) -> Result<ExpenseId, LedgerError> {
        let expense_id = expense.id();
        let result = self.inner.lock().add_expense(expense);
        if let Err(err) = &result {
            tracing::warn!(expense_id = %expense_id, error = %err, "Expense rejected");
        }
        result
    }

    pub fn remove_expense(&self, id: ExpenseId) -> Option<Expense> {
        let removed = self.inner.lock().remove_expense(id);
        if removed.is_none() {
            tracing::debug!(expense_id = %id, "Expense to remove was not found");
        }
        removed
    }

    /// Runs `f` against the ledger while holding the lock.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn snapshot(&self) -> Ledger {
        self.inner.lock().clone()
    }

    pub fn report(&self, range: Option<&DateRange>) -> Result<SettlementReport, ReportError> {
        let ledger = self.inner.lock();
        build_report(&ledger, range)
    }
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self::new(ledger)
    }
}
