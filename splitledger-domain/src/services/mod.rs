pub mod balance_calculator;
pub mod settlement_calculator;
pub mod settlement_rounding;
pub mod share_allocator;

pub use balance_calculator::{BalanceAccumulator, BalanceCalculator, compute_balances};
pub use settlement_calculator::{SettlementCalculator, compute_settlements};
pub use settlement_rounding::{
    RoundingMode, SettlementContext, SettlementRoundingError, quantize_balances,
};
pub use share_allocator::{LineAllocation, ShareAllocator};
