use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    model::{ExpenseId, Member, Money},
    services::SettlementRoundingError,
};

/// Rejection reasons for a malformed member name or expense.
///
/// `line` is the 1-based position of the offending share line inside its expense.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("member name must not be empty")]
    EmptyMemberName,
    #[error("expense has no share lines")]
    NoLines,
    #[error("expense {id} is already recorded")]
    DuplicateExpense { id: ExpenseId },
    #[error("line {line}: amount must be positive (got {amount})")]
    NonPositiveAmount { line: usize, amount: Money },
    #[error("line {line}: no participants")]
    EmptyParticipants { line: usize },
    #[error("line {line}: unknown member '{member}'")]
    UnknownMember { line: usize, member: Member },
    #[error("line {line}: share of '{member}' is negative ({share})")]
    NegativeShare {
        line: usize,
        member: Member,
        share: Decimal,
    },
    #[error("line {line}: shares total {actual}, expected {expected}")]
    ShareMismatch {
        line: usize,
        expected: Money,
        actual: Money,
    },
    #[error("line {line}: percentages total {total}, expected 100")]
    PercentageMismatch { line: usize, total: Decimal },
    #[error("line {line}: {amount} cannot be split in whole units at scale {scale}")]
    UnrepresentableAmount {
        line: usize,
        amount: Money,
        scale: u32,
    },
    #[error("line {line}: amounts exceed the representable range")]
    AmountOverflow { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("member '{0}' already exists")]
    DuplicateMember(Member),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("expense {expense} cannot be applied: {source}")]
    InvalidExpense {
        expense: ExpenseId,
        source: ValidationError,
    },
    #[error("expense {expense} pushes a balance past the representable range")]
    BalanceOverflow { expense: ExpenseId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Rounding(#[from] SettlementRoundingError),
    /// One side ran out while the other still had outstanding amounts.
    #[error(
        "balances do not sum to zero: {residual} left over across {} member(s)",
        .unmatched.len()
    )]
    UnbalancedLedger {
        residual: Money,
        unmatched: Vec<(Member, Money)>,
    },
}
