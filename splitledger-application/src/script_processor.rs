use fxhash::FxHashMap;
use splitledger_domain::{
    DateRange, Expense, ExpenseId, Ledger, Member, Money, SettlementContext, ShareLine,
};
use splitledger_parser::{
    Command, ExpenseDecl, ExpenseLine, Participants, RangeSpec, Statement, parse_script,
};

use crate::{
    error::ProcessingError,
    model::{ReportKind, ScriptOutcome, ScriptReport},
    report::build_report,
};

/// Replays a script against a fresh ledger.
///
/// Reports are taken at the point where their command appears, so a
/// `!settle` only sees the expenses declared above it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptProcessor {
    context: SettlementContext,
}

impl ScriptProcessor {
    pub fn new(context: SettlementContext) -> Self {
        Self { context }
    }

    pub fn process(&self, content: &str) -> Result<ScriptOutcome, ProcessingError> {
        let script = parse_script(content)?;
        let mut ledger = Ledger::with_context(self.context);
        let mut expense_lines: FxHashMap<usize, ExpenseId> = FxHashMap::default();
        let mut reports = Vec::new();

        for stmt in &script.statements {
            let line = stmt.line;
            match &stmt.statement {
                Statement::Members(names) => {
                    for name in names {
                        ledger
                            .add_member(name)
                            .map_err(|source| ProcessingError::Ledger { line, source })?;
                    }
                }
                Statement::Expense(decl) => {
                    let id = ledger
                        .add_expense(to_expense(decl, line))
                        .map_err(|source| ProcessingError::Ledger { line, source })?;
                    expense_lines.insert(line, id);
                }
                Statement::Command(Command::Remove(target)) => {
                    let Some(id) = expense_lines.get(target) else {
                        return Err(ProcessingError::NoExpenseAtLine {
                            line,
                            target: *target,
                        });
                    };
                    if ledger.remove_expense(*id).is_none() {
                        tracing::warn!(line, target = *target, "Expense was already removed");
                    }
                }
                Statement::Command(Command::Balances(range)) => {
                    reports.push(Self::report_at(&ledger, line, ReportKind::Balances, *range)?);
                }
                Statement::Command(Command::Settle(range)) => {
                    reports.push(Self::report_at(&ledger, line, ReportKind::Settlement, *range)?);
                }
            }
        }

        if !script.has_report_commands() {
            let report = build_report(&ledger, None).map_err(ProcessingError::FinalReport)?;
            reports.push(ScriptReport {
                line: None,
                kind: ReportKind::Settlement,
                range: None,
                report,
            });
        }

        tracing::info!(
            statement_count = script.statements.len(),
            member_count = ledger.members().len(),
            expense_count = ledger.expenses().len(),
            report_count = reports.len(),
            "Script processed"
        );
        Ok(ScriptOutcome { ledger, reports })
    }

    fn report_at(
        ledger: &Ledger,
        line: usize,
        kind: ReportKind,
        range: Option<RangeSpec>,
    ) -> Result<ScriptReport, ProcessingError> {
        let range = range.map(|spec| DateRange::new(spec.start, spec.end));
        let report = build_report(ledger, range.as_ref())
            .map_err(|source| ProcessingError::Report { line, source })?;
        Ok(ScriptReport {
            line: Some(line),
            kind,
            range,
            report,
        })
    }
}

fn to_expense(decl: &ExpenseDecl<'_>, line: usize) -> Expense {
    let description = decl
        .description
        .map_or_else(|| format!("line {line}"), str::to_string);
    let expense = Expense::new(description, decl.lines.iter().map(to_share_line).collect());
    match decl.date {
        Some(date) => expense.with_date(date),
        None => expense,
    }
}

fn to_share_line(line: &ExpenseLine<'_>) -> ShareLine {
    let payer = Member::from(line.payer);
    let amount = Money::from_decimal(line.amount);
    match &line.participants {
        Participants::Equal(names) => {
            ShareLine::equal(payer, amount, names.iter().copied().map(Member::from))
        }
        Participants::Exact(shares) => ShareLine::exact(
            payer,
            amount,
            shares
                .iter()
                .map(|(name, share)| (Member::from(*name), Money::from_decimal(*share))),
        ),
        Participants::Percent(percentages) => ShareLine::percent(
            payer,
            amount,
            percentages
                .iter()
                .map(|(name, pct)| (Member::from(*name), *pct)),
        ),
    }
}
