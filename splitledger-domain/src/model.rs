use std::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use arcstr::ArcStr;
use chrono::NaiveDate;
use fxhash::FxBuildHasher;
use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ValidationError,
    services::{SettlementContext, ShareAllocator},
};

/// Members in insertion order.
pub type MemberSet = IndexSet<Member, FxBuildHasher>;

/// Signed net position per member, in member order.
/// Positive: the member is owed money. Negative: the member owes money.
pub type MemberBalances = IndexMap<Member, Money, FxBuildHasher>;

/// Name of a ledger member. Comparison is exact and case sensitive.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Member(ArcStr);

impl Member {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Borrow<str> for Member {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Member {
    fn from(name: &str) -> Self {
        Self(ArcStr::from(name))
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn from_i64(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// `None` once a partial sum leaves the decimal range.
    pub fn checked_sum<I>(iter: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        iter.into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }

    pub fn signum(self) -> i64 {
        if self.is_positive() {
            1
        } else if self.is_negative() {
            -1
        } else {
            0
        }
    }

    /// Rounds half away from zero to `scale` decimal places.
    pub fn round_dp(self, scale: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(scale, rust_decimal::RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Self)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(Uuid);

impl ExpenseId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// How a line's amount is divided among its participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// Same share for everyone; leftover atomic units go to the first participants.
    Equal(MemberSet),
    /// Absolute share per participant.
    Exact(IndexMap<Member, Money, FxBuildHasher>),
    /// Percentage of the amount per participant, totalling 100.
    Percent(IndexMap<Member, Decimal, FxBuildHasher>),
}

impl Split {
    pub fn participant_count(&self) -> usize {
        match self {
            Split::Equal(members) => members.len(),
            Split::Exact(shares) => shares.len(),
            Split::Percent(percentages) => percentages.len(),
        }
    }

    pub fn participants(&self) -> Box<dyn Iterator<Item = &Member> + '_> {
        match self {
            Split::Equal(members) => Box::new(members.iter()),
            Split::Exact(shares) => Box::new(shares.keys()),
            Split::Percent(percentages) => Box::new(percentages.keys()),
        }
    }
}

/// One payer covering `amount` on behalf of a set of participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLine {
    payer: Member,
    amount: Money,
    split: Split,
}

impl ShareLine {
    pub fn new(payer: Member, amount: Money, split: Split) -> Self {
        Self {
            payer,
            amount,
            split,
        }
    }

    pub fn equal<I>(payer: Member, amount: Money, participants: I) -> Self
    where
        I: IntoIterator<Item = Member>,
    {
        Self::new(payer, amount, Split::Equal(participants.into_iter().collect()))
    }

    pub fn exact<I>(payer: Member, amount: Money, shares: I) -> Self
    where
        I: IntoIterator<Item = (Member, Money)>,
    {
        Self::new(payer, amount, Split::Exact(shares.into_iter().collect()))
    }

    pub fn percent<I>(payer: Member, amount: Money, percentages: I) -> Self
    where
        I: IntoIterator<Item = (Member, Decimal)>,
    {
        Self::new(payer, amount, Split::Percent(percentages.into_iter().collect()))
    }

    pub fn payer(&self) -> &Member {
        &self.payer
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn participants(&self) -> impl Iterator<Item = &Member> + '_ {
        self.split.participants()
    }

    /// Payer first, then participants.
    pub fn referenced_members(&self) -> impl Iterator<Item = &Member> + '_ {
        std::iter::once(&self.payer).chain(self.participants())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    id: ExpenseId,
    description: String,
    date: Option<NaiveDate>,
    lines: Vec<ShareLine>,
}

impl Expense {
    pub fn new(description: impl Into<String>, lines: Vec<ShareLine>) -> Self {
        Self {
            id: ExpenseId::generate(),
            description: description.into(),
            date: None,
            lines,
        }
    }

    /// A single payer and a single split covering the whole amount.
    pub fn simple(description: impl Into<String>, line: ShareLine) -> Self {
        Self::new(description, vec![line])
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Keeps an identifier assigned elsewhere, e.g. when a shell reloads stored expenses.
    pub fn with_id(mut self, id: ExpenseId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> ExpenseId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn lines(&self) -> &[ShareLine] {
        &self.lines
    }

    /// Sum of all line amounts, `None` if it overflows.
    pub fn total(&self) -> Option<Money> {
        Money::checked_sum(self.lines.iter().map(ShareLine::amount))
    }

    pub fn validate(
        &self,
        members: &MemberSet,
        context: SettlementContext,
    ) -> Result<(), ValidationError> {
        ShareAllocator::new(context)
            .allocate_expense(self, members)
            .map(|_| ())
    }
}

/// Inclusive date window. Expenses without a date fall inside every range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else {
            return true;
        };
        self.start.is_none_or(|start| start <= date) && self.end.is_none_or(|end| date <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{start}")?;
        }
        f.write_str("..")?;
        if let Some(end) = self.end {
            write!(f, "{end}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInstruction {
    pub debtor: Member,
    pub creditor: Member,
    pub amount: Money,
}

impl SettlementInstruction {
    /// Records the payment: the debtor's balance rises and the creditor's falls.
    pub fn apply_to(&self, balances: &mut MemberBalances) {
        *balances.entry(self.debtor.clone()).or_insert(Money::ZERO) += self.amount;
        *balances.entry(self.creditor.clone()).or_insert(Money::ZERO) -= self.amount;
    }
}

impl fmt::Display for SettlementInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pays {} {}", self.debtor, self.creditor, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case::undated(None, DateRange::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 31))), true)]
    #[case::inside(Some(date(2024, 1, 15)), DateRange::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 31))), true)]
    #[case::start_inclusive(Some(date(2024, 1, 1)), DateRange::new(Some(date(2024, 1, 1)), None), true)]
    #[case::end_inclusive(Some(date(2024, 1, 31)), DateRange::new(None, Some(date(2024, 1, 31))), true)]
    #[case::before(Some(date(2023, 12, 31)), DateRange::new(Some(date(2024, 1, 1)), None), false)]
    #[case::after(Some(date(2024, 2, 1)), DateRange::new(None, Some(date(2024, 1, 31))), false)]
    #[case::unbounded(Some(date(1999, 1, 1)), DateRange::unbounded(), true)]
    fn date_range_contains(
        #[case] expense_date: Option<NaiveDate>,
        #[case] range: DateRange,
        #[case] expected: bool,
    ) {
        assert_eq!(range.contains(expense_date), expected);
    }

    #[test]
    fn member_lookup_by_str() {
        let members: MemberSet = ["Alice", "Bob"].into_iter().map(Member::from).collect();
        assert!(members.contains("Alice"));
        assert!(!members.contains("alice"));
    }

    #[test]
    fn equal_split_collapses_duplicate_participants() {
        let line = ShareLine::equal(
            Member::from("A"),
            Money::from_i64(10),
            ["A", "B", "A"].into_iter().map(Member::from),
        );
        assert_eq!(line.split().participant_count(), 2);
    }

    #[test]
    fn instruction_display_and_apply() {
        let instruction = SettlementInstruction {
            debtor: Member::from("Bob"),
            creditor: Member::from("Alice"),
            amount: Money::new(3000, 2),
        };
        assert_eq!(instruction.to_string(), "Bob pays Alice 30.00");

        let mut balances: MemberBalances = [
            (Member::from("Alice"), Money::new(3000, 2)),
            (Member::from("Bob"), Money::new(-3000, 2)),
        ]
        .into_iter()
        .collect();
        instruction.apply_to(&mut balances);
        assert!(balances.values().all(|money| money.is_zero()));
    }
}
