use splitledger_domain::{BalanceError, LedgerError, SettlementError, SettlementRoundingError};
use splitledger_parser::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error(transparent)]
    Rounding(#[from] SettlementRoundingError),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Line {line}: {source}")]
    Ledger { line: usize, source: LedgerError },
    #[error("Line {line}: line {target} does not declare an expense")]
    NoExpenseAtLine { line: usize, target: usize },
    #[error("Line {line}: {source}")]
    Report { line: usize, source: ReportError },
    #[error(transparent)]
    FinalReport(ReportError),
}

impl ProcessingError {
    /// Script line the error points at, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse(ParseError::SyntaxError { line, .. })
            | Self::Ledger { line, .. }
            | Self::NoExpenseAtLine { line, .. }
            | Self::Report { line, .. } => Some(*line),
            Self::FinalReport(_) => None,
        }
    }
}
