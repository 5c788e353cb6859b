use rstest::{fixture, rstest};
use splitledger_application::{ProcessingError, ReportKind, ScriptOutcome, ScriptProcessor};
use splitledger_domain::{Money, SettlementContext};

#[fixture]
fn processor() -> ScriptProcessor {
    ScriptProcessor::new(SettlementContext::cents())
}

fn run(processor: &ScriptProcessor, script: &str) -> ScriptOutcome {
    match processor.process(script) {
        Ok(outcome) => outcome,
        Err(err) => panic!("script failed: {err}"),
    }
}

fn settlement_lines(outcome: &ScriptOutcome, index: usize) -> Vec<String> {
    outcome.reports[index]
        .report
        .settlements
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[rstest]
fn full_trip_script(processor: ScriptProcessor) {
    let script = r#"MEMBERS := Alice Bob Carol
// day one
2024-05-01 "Dinner" Alice paid 60 for Alice=20 Bob=40; Bob paid 30 for Carol
"Taxi" Carol paid 40 for Alice=25% Carol=75%
Alice paid 90 for Alice Bob Carol
!remove 5
!balances
!settle 2024-05-01..2024-05-31"#;
    let outcome = run(&processor, script);

    assert_eq!(outcome.ledger.expenses().len(), 2);
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.reports[0].kind, ReportKind::Balances);
    assert_eq!(outcome.reports[1].kind, ReportKind::Settlement);

    // Dinner: Alice +60-20, Bob -40+30, Carol -30. Taxi: Alice -10, Carol +40-30.
    let balances = &outcome.reports[0].report.balances;
    assert_eq!(balances["Alice"], Money::new(3000, 2));
    assert_eq!(balances["Bob"], Money::new(-1000, 2));
    assert_eq!(balances["Carol"], Money::new(-2000, 2));

    assert_eq!(
        settlement_lines(&outcome, 1),
        ["Carol pays Alice 20.00", "Bob pays Alice 10.00"]
    );
}

#[rstest]
fn mutual_payments_settle_to_nothing(processor: ScriptProcessor) {
    let outcome = run(
        &processor,
        "MEMBERS := A B\nA paid 50 for A B\nB paid 50 for A B",
    );
    assert!(outcome.reports[0].report.is_settled());
}

#[rstest]
fn explicit_shares_within_tolerance_are_accepted(processor: ScriptProcessor) {
    let outcome = run(
        &processor,
        "MEMBERS := A B C\nA paid 10 for B=3.33 C=6.66",
    );
    let total: Money = outcome.reports[0].report.balances.values().sum();
    assert!(total.is_zero());
}

#[rstest]
#[case::shares_off("MEMBERS := A B\nA paid 10 for B=9", 2)]
#[case::percent_off("MEMBERS := A B\nA paid 10 for A=50% B=40%", 2)]
#[case::unknown_in_second_line("MEMBERS := A B\nA paid 1 for B; Z paid 1 for A", 2)]
fn invalid_expenses_are_reported_with_line(
    processor: ScriptProcessor,
    #[case] script: &str,
    #[case] line: usize,
) {
    let err = processor.process(script).unwrap_err();
    assert!(matches!(err, ProcessingError::Ledger { .. }), "{err:?}");
    assert_eq!(err.line(), Some(line));
}
