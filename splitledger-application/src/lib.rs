#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod model;
pub mod report;
pub mod script_processor;
pub mod shared_ledger;

pub use error::{ProcessingError, ReportError};
pub use model::{ReportKind, ScriptOutcome, ScriptReport, SettlementReport};
pub use report::build_report;
pub use script_processor::ScriptProcessor;
pub use shared_ledger::SharedLedger;
