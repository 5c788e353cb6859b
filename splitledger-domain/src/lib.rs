#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod ledger;
pub mod model;
pub mod services;

pub use error::{BalanceError, LedgerError, SettlementError, ValidationError};
pub use ledger::Ledger;
pub use model::{
    DateRange, Expense, ExpenseId, Member, MemberBalances, MemberSet, Money, SettlementInstruction,
    ShareLine, Split,
};
pub use services::{
    BalanceCalculator, RoundingMode, SettlementCalculator, SettlementContext,
    SettlementRoundingError, ShareAllocator, compute_balances, compute_settlements,
    quantize_balances,
};
