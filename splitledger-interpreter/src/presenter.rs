use std::fmt::Write as _;

use splitledger_application::{ReportKind, ScriptReport, SettlementReport};
use splitledger_domain::MemberBalances;

pub const SETTLED_MESSAGE: &str = "All balances are settled!";

pub struct ReportPresenter;

impl ReportPresenter {
    pub fn render(report: &ScriptReport) -> String {
        let mut out = String::new();
        let scope = match &report.range {
            Some(range) => format!(" ({range})"),
            None => String::new(),
        };

        let _ = writeln!(out, "Balances{scope}:");
        Self::write_balances(&mut out, &report.report.balances);

        if report.kind == ReportKind::Settlement {
            let _ = writeln!(out, "Settlements{scope}:");
            Self::write_settlements(&mut out, &report.report);
        }
        out
    }

    fn write_balances(out: &mut String, balances: &MemberBalances) {
        let width = balances
            .keys()
            .map(|member| member.as_str().chars().count())
            .max()
            .unwrap_or(0);
        for (member, balance) in balances {
            let sign = if balance.is_positive() { "+" } else { "" };
            let _ = writeln!(out, "  {:<width$}  {sign}{balance}", member.as_str());
        }
    }

    fn write_settlements(out: &mut String, report: &SettlementReport) {
        if report.is_settled() {
            let _ = writeln!(out, "  {SETTLED_MESSAGE}");
            return;
        }
        for instruction in &report.settlements {
            let _ = writeln!(out, "  {instruction}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitledger_application::ScriptProcessor;

    fn render_script(script: &str) -> Vec<String> {
        let outcome = ScriptProcessor::default().process(script).unwrap();
        outcome.reports.iter().map(ReportPresenter::render).collect()
    }

    #[test]
    fn renders_balances_and_settlements() {
        let rendered = render_script("MEMBERS := Alice Bob Carol\nAlice paid 90 for Alice Bob Carol");
        assert_eq!(
            rendered,
            [concat!(
                "Balances:\n",
                "  Alice  +60.00\n",
                "  Bob    -30.00\n",
                "  Carol  -30.00\n",
                "Settlements:\n",
                "  Bob pays Alice 30.00\n",
                "  Carol pays Alice 30.00\n",
            )]
        );
    }

    #[test]
    fn renders_settled_message() {
        let rendered = render_script("MEMBERS := A B\nA paid 50 for A B\nB paid 50 for A B\n!settle");
        assert!(rendered[0].ends_with(&format!("Settlements:\n  {SETTLED_MESSAGE}\n")));
        assert!(rendered[0].contains("  A  0.00\n"));
    }

    #[test]
    fn balances_command_omits_settlements() {
        let rendered = render_script("MEMBERS := A B\nA paid 10 for B\n!balances ..2024-12-31");
        assert_eq!(rendered[0], "Balances (..2024-12-31):\n  A  +10.00\n  B  -10.00\n");
    }
}
