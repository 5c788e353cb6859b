#![warn(clippy::uninlined_format_args)]

mod detail;

use std::str::FromStr;

use chrono::NaiveDate;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till, take_until, take_while, take_while_m_n},
    character::complete::{char, digit1, multispace1, satisfy, u64},
    combinator::{cut, map_opt, map_res, opt, recognize},
    multi::many0,
    sequence::{delimited, preceded},
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum Participants<'a> {
    Equal(Vec<&'a str>),
    Exact(Vec<(&'a str, Decimal)>),
    Percent(Vec<(&'a str, Decimal)>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParticipantItem<'a> {
    Plain(&'a str),
    Amount(&'a str, Decimal),
    Percent(&'a str, Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MixedParticipants;

impl<'a> Participants<'a> {
    // The first item decides the style; every other item must follow it.
    fn from_items(items: Vec<ParticipantItem<'a>>) -> Result<Self, MixedParticipants> {
        match items.first() {
            Some(ParticipantItem::Plain(_)) | None => items
                .into_iter()
                .map(|item| match item {
                    ParticipantItem::Plain(name) => Ok(name),
                    _ => Err(MixedParticipants),
                })
                .collect::<Result<_, _>>()
                .map(Self::Equal),
            Some(ParticipantItem::Amount(..)) => items
                .into_iter()
                .map(|item| match item {
                    ParticipantItem::Amount(name, amount) => Ok((name, amount)),
                    _ => Err(MixedParticipants),
                })
                .collect::<Result<_, _>>()
                .map(Self::Exact),
            Some(ParticipantItem::Percent(..)) => items
                .into_iter()
                .map(|item| match item {
                    ParticipantItem::Percent(name, pct) => Ok((name, pct)),
                    _ => Err(MixedParticipants),
                })
                .collect::<Result<_, _>>()
                .map(Self::Percent),
        }
    }
}

/// `payer paid amount for participants`
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseLine<'a> {
    pub payer: &'a str,
    pub amount: Decimal,
    pub participants: Participants<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDecl<'a> {
    pub date: Option<NaiveDate>,
    pub description: Option<&'a str>,
    pub lines: Vec<ExpenseLine<'a>>,
}

/// Inclusive `start..end`; either side may be left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeSpec {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Balances(Option<RangeSpec>),
    Settle(Option<RangeSpec>),
    /// Script line of the expense to drop.
    Remove(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    Members(Vec<&'a str>),
    Expense(ExpenseDecl<'a>),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementWithLine<'a> {
    pub line: usize,
    pub statement: Statement<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script<'a> {
    pub statements: Vec<StatementWithLine<'a>>,
}

impl Script<'_> {
    /// True when a `!balances` or `!settle` command appears; `!remove` does not count.
    pub fn has_report_commands(&self) -> bool {
        self.statements.iter().any(|stmt| {
            matches!(
                stmt.statement,
                Statement::Command(Command::Balances(_) | Command::Settle(_))
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}: {detail}")]
    SyntaxError { line: usize, detail: String },
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize((
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    ))
    .parse(input)
}

fn sp(input: &str) -> IResult<&str, &str> {
    fn comment(input: &str) -> IResult<&str, &str> {
        delimited(tag("/*"), take_until("*/"), tag("*/")).parse(input)
    }

    fn line_comment(input: &str) -> IResult<&str, &str> {
        recognize((tag("//"), take_till(|c| c == '\n'))).parse(input)
    }

    recognize(many0(alt((multispace1, comment, line_comment)))).parse(input)
}

fn decimal(input: &str) -> IResult<&str, Decimal> {
    map_opt(
        recognize((opt(char('-')), digit1, opt((char('.'), digit1)))),
        |text: &str| Decimal::from_str(text).ok(),
    )
    .parse(input)
}

fn date(input: &str) -> IResult<&str, NaiveDate> {
    fn year(input: &str) -> IResult<&str, &str> {
        take_while_m_n(4, 4, |c: char| c.is_ascii_digit())(input)
    }

    fn two_digits(input: &str) -> IResult<&str, &str> {
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit())(input)
    }

    map_opt(
        recognize((year, char('-'), two_digits, char('-'), two_digits)),
        |text: &str| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
    )
    .parse(input)
}

fn date_range(input: &str) -> IResult<&str, RangeSpec> {
    (opt(date), tag(".."), opt(date))
        .map(|(start, _, end)| RangeSpec { start, end })
        .parse(input)
}

fn description(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"')).parse(input)
}

// MEMBERS := Alice Bob Carol
fn members(input: &str) -> IResult<&str, Vec<&str>> {
    (
        tag("MEMBERS"),
        sp,
        tag(":="),
        sp,
        identifier,
        many0(preceded(sp, identifier)),
    )
        .map(|(_, _, _, _, first, rest)| {
            let mut names = Vec::with_capacity(rest.len() + 1);
            names.push(first);
            names.extend(rest);
            names
        })
        .parse(input)
}

fn participant_item(input: &str) -> IResult<&str, ParticipantItem<'_>> {
    alt((
        (identifier, char('='), decimal, char('%'))
            .map(|(name, _, pct, _)| ParticipantItem::Percent(name, pct)),
        (identifier, char('='), decimal).map(|(name, _, amount)| ParticipantItem::Amount(name, amount)),
        identifier.map(ParticipantItem::Plain),
    ))
    .parse(input)
}

fn participants(input: &str) -> IResult<&str, Participants<'_>> {
    map_res(
        (participant_item, many0(preceded(sp, participant_item))),
        |(first, rest)| {
            let mut items = Vec::with_capacity(rest.len() + 1);
            items.push(first);
            items.extend(rest);
            Participants::from_items(items)
        },
    )
    .parse(input)
}

// {payer} paid {amount} for {participants}
fn expense_line(input: &str) -> IResult<&str, ExpenseLine<'_>> {
    (
        identifier, // payer
        sp,
        tag_no_case("paid"),
        sp,
        decimal,
        sp,
        tag_no_case("for"),
        sp,
        participants,
    )
        .map(|(payer, _, _, _, amount, _, _, _, participants)| ExpenseLine {
            payer,
            amount,
            participants,
        })
        .parse(input)
}

fn expense(input: &str) -> IResult<&str, ExpenseDecl<'_>> {
    (
        opt((date, sp).map(|(date, _)| date)),
        opt((description, sp).map(|(text, _)| text)),
        expense_line,
        many0(preceded((sp, char(';'), sp), cut(expense_line))),
    )
        .map(|(date, description, first, rest)| {
            let mut lines = Vec::with_capacity(rest.len() + 1);
            lines.push(first);
            lines.extend(rest);
            ExpenseDecl {
                date,
                description,
                lines,
            }
        })
        .parse(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    alt((
        (tag_no_case("!remove"), sp, u64).map(|(_, _, line)| Command::Remove(line as usize)),
        (tag_no_case("!balances"), opt(preceded(sp, date_range)))
            .map(|(_, range)| Command::Balances(range)),
        (tag_no_case("!settle"), opt(preceded(sp, date_range)))
            .map(|(_, range)| Command::Settle(range)),
    ))
    .parse(input)
}

// The expense branch stays last so its error is the one reported.
fn statement(input: &str) -> IResult<&str, Statement<'_>> {
    alt((
        members.map(Statement::Members),
        command.map(Statement::Command),
        expense.map(Statement::Expense),
    ))
    .parse(input)
}

fn statement_with_sp(input: &str) -> IResult<&str, Statement<'_>> {
    (sp, statement, sp).map(|(_, stmt, _)| stmt).parse(input)
}

/// Parses a whole script, one statement per line.
pub fn parse_script<'a>(input: &'a str) -> Result<Script<'a>, ParseError> {
    let mut statements = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let (rest, _) = sp(line).map_err(|e| ParseError::SyntaxError {
            line: idx + 1,
            detail: detail::syntax_error_detail(e),
        })?;
        if rest.trim().is_empty() {
            continue;
        }
        match statement_with_sp(rest) {
            Ok((rest, stmt)) => {
                if !rest.trim().is_empty() {
                    return Err(ParseError::SyntaxError {
                        line: idx + 1,
                        detail: detail::unparsed_detail(rest.trim()),
                    });
                }
                statements.push(StatementWithLine {
                    line: idx + 1,
                    statement: stmt,
                });
            }
            Err(e) => {
                return Err(ParseError::SyntaxError {
                    line: idx + 1,
                    detail: detail::syntax_error_detail(e),
                });
            }
        }
    }

    Ok(Script { statements })
}
