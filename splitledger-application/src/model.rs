use splitledger_domain::{DateRange, Ledger, MemberBalances, SettlementInstruction};

/// Balances of a ledger snapshot and the transfers that clear them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReport {
    pub balances: MemberBalances,
    pub settlements: Vec<SettlementInstruction>,
}

impl SettlementReport {
    pub fn is_settled(&self) -> bool {
        self.settlements.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Balances,
    Settlement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    /// `None` for the report produced when a script has no commands.
    pub line: Option<usize>,
    pub kind: ReportKind,
    pub range: Option<DateRange>,
    pub report: SettlementReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub ledger: Ledger,
    pub reports: Vec<ScriptReport>,
}
