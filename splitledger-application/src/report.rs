use splitledger_domain::{DateRange, Ledger, SettlementCalculator, compute_balances, quantize_balances};

use crate::{error::ReportError, model::SettlementReport};

/// Computes balances over `range`, rounds them to whole atomic units and settles them.
pub fn build_report(
    ledger: &Ledger,
    range: Option<&DateRange>,
) -> Result<SettlementReport, ReportError> {
    let context = ledger.context();
    let balances = compute_balances(ledger, range)?;
    let balances = quantize_balances(&balances, context)?;
    let settlements = SettlementCalculator::new(&context).calculate(&balances)?;

    tracing::debug!(
        member_count = balances.len(),
        settlement_count = settlements.len(),
        "Settlement report built"
    );
    Ok(SettlementReport {
        balances,
        settlements,
    })
}
