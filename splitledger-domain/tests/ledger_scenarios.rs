use rstest::{fixture, rstest};
use splitledger_domain::{
    Expense, Ledger, LedgerError, Member, MemberBalances, Money, SettlementError,
    SettlementInstruction, ShareLine, ValidationError, compute_balances, compute_settlements,
};

fn member(name: &str) -> Member {
    Member::from(name)
}

fn ledger_with(names: &[&str]) -> Ledger {
    let mut ledger = Ledger::new();
    for name in names {
        ledger.add_member(name).unwrap();
    }
    ledger
}

fn equal(payer: &str, cents: i64, participants: &[&str]) -> Expense {
    Expense::simple(
        "shared",
        ShareLine::equal(
            member(payer),
            Money::new(cents, 2),
            participants.iter().copied().map(member),
        ),
    )
}

fn cents_of(balances: &MemberBalances) -> Vec<(&str, Money)> {
    balances
        .iter()
        .map(|(member, money)| (member.as_str(), *money))
        .collect()
}

fn instruction(debtor: &str, creditor: &str, cents: i64) -> SettlementInstruction {
    SettlementInstruction {
        debtor: member(debtor),
        creditor: member(creditor),
        amount: Money::new(cents, 2),
    }
}

#[fixture]
fn trio() -> Ledger {
    ledger_with(&["Alice", "Bob", "Carol"])
}

#[rstest]
fn one_payer_for_everyone(mut trio: Ledger) {
    trio.add_expense(equal("Alice", 9000, &["Alice", "Bob", "Carol"]))
        .unwrap();

    let balances = compute_balances(&trio, None).unwrap();
    assert_eq!(
        cents_of(&balances),
        [
            ("Alice", Money::new(6000, 2)),
            ("Bob", Money::new(-3000, 2)),
            ("Carol", Money::new(-3000, 2)),
        ]
    );

    let settlements = compute_settlements(&balances).unwrap();
    assert_eq!(
        settlements,
        [
            instruction("Bob", "Alice", 3000),
            instruction("Carol", "Alice", 3000),
        ]
    );
    assert_eq!(settlements[0].to_string(), "Bob pays Alice 30.00");
}

#[test]
fn mutual_payments_cancel_out() {
    let mut ledger = ledger_with(&["A", "B"]);
    ledger.add_expense(equal("A", 5000, &["A", "B"])).unwrap();
    ledger.add_expense(equal("B", 5000, &["A", "B"])).unwrap();

    let balances = compute_balances(&ledger, None).unwrap();
    assert!(balances.values().all(|money| money.is_zero()));
    assert!(compute_settlements(&balances).unwrap().is_empty());
}

#[rstest]
fn unknown_participant_is_rejected(mut trio: Ledger) {
    trio.add_expense(equal("Alice", 1000, &["Bob"])).unwrap();

    let result = trio.add_expense(equal("Alice", 1000, &["Bob", "Zed"]));
    assert!(matches!(
        result,
        Err(LedgerError::Validation(ValidationError::UnknownMember { ref member, .. }))
            if member.as_str() == "Zed"
    ));
    assert_eq!(trio.expenses().len(), 1);
}

#[rstest]
fn duplicate_member_is_rejected(mut trio: Ledger) {
    let result = trio.add_member("Bob");
    assert_eq!(result, Err(LedgerError::DuplicateMember(member("Bob"))));
    assert_eq!(trio.members().len(), 3);
}

#[test]
fn equal_creditors_are_paid_in_member_order() {
    let mut ledger = ledger_with(&["Bob", "Alice", "Carol"]);
    ledger.add_expense(equal("Bob", 1000, &["Carol"])).unwrap();
    ledger.add_expense(equal("Alice", 1000, &["Carol"])).unwrap();

    let balances = compute_balances(&ledger, None).unwrap();
    let settlements = compute_settlements(&balances).unwrap();
    assert_eq!(
        settlements,
        [
            instruction("Carol", "Bob", 1000),
            instruction("Carol", "Alice", 1000),
        ]
    );
}

#[test]
fn hand_built_unbalanced_input_is_rejected() {
    let balances: MemberBalances = [
        (member("A"), Money::new(1000, 2)),
        (member("B"), Money::new(-400, 2)),
    ]
    .into_iter()
    .collect();

    match compute_settlements(&balances) {
        Err(SettlementError::UnbalancedLedger {
            residual,
            unmatched,
        }) => {
            assert_eq!(residual, Money::new(600, 2));
            assert_eq!(unmatched, [(member("A"), Money::new(600, 2))]);
        }
        other => panic!("expected unbalanced ledger, got {other:?}"),
    }
}

#[rstest]
fn serde_round_trip_reproduces_balances(mut trio: Ledger) {
    trio.add_expense(equal("Alice", 10000, &["Alice", "Bob", "Carol"]))
        .unwrap();
    trio.add_expense(
        Expense::simple(
            "hotel",
            ShareLine::exact(
                member("Bob"),
                Money::new(12000, 2),
                [
                    (member("Alice"), Money::new(4000, 2)),
                    (member("Carol"), Money::new(8000, 2)),
                ],
            ),
        )
        .with_date(chrono::NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()),
    )
    .unwrap();

    let json = serde_json::to_string(&trio).unwrap();
    let restored: Ledger = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, trio);
    assert_eq!(
        compute_balances(&restored, None).unwrap(),
        compute_balances(&trio, None).unwrap()
    );
}
