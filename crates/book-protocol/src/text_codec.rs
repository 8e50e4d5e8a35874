//! Text event codec.
//!
//! Input format (space-separated tokens, one event per line):
//!
//! - Add:    `A <side> <type> <price> <qty> <id>`
//!   side ∈ {B, S}; type ∈ {GoodTillCancel, FillAndKill, FillOrKill, Market}
//! - Modify: `M <id> <side> <price> <qty>`
//! - Cancel: `C <id>`
//! - Result: `R <total> <bids> <asks>` — expected order count and level
//!   counts per side; must be the last non-empty line.
//!
//! Negative numerics are invalid anywhere. A result line anywhere but the
//! end, or a file without one, is an error.

use book_core::{OrderId, OrderType, Price, Quantity, Side, Trade};
use thiserror::Error;

/// A single parsed book event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Add {
        order_type: OrderType,
        side: Side,
        price: Price,
        quantity: Quantity,
        id: OrderId,
    },
    Modify {
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    },
    Cancel {
        id: OrderId,
    },
}

/// Expected terminal counts from the result line: total live orders, bid
/// levels, ask levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedCounts {
    pub total: usize,
    pub bids: usize,
    pub asks: usize,
}

/// Why a script failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unknown event prefix {prefix:?}")]
    UnknownPrefix { line: usize, prefix: String },

    #[error("line {line}: unknown side {token:?}")]
    UnknownSide { line: usize, token: String },

    #[error("line {line}: unknown order type {token:?}")]
    UnknownOrderType { line: usize, token: String },

    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: negative value {token:?}")]
    NegativeValue { line: usize, token: String },

    #[error("line {line}: quantity must be positive")]
    ZeroQuantity { line: usize },

    #[error("line {line}: expected {expected} fields, found {found}")]
    WrongFieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: result line must be the last non-empty line")]
    ResultNotAtEnd { line: usize },

    #[error("result line missing")]
    MissingResult,
}

/// A parsed line: either an event or the terminal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLine {
    Event(Event),
    Result(ExpectedCounts),
}

/// Parse a full script: every event line followed by the terminal result
/// line. Blank (whitespace-only) lines are skipped.
pub fn parse_script(input: &str) -> Result<(Vec<Event>, ExpectedCounts), ParseError> {
    let mut events = Vec::new();
    let mut result: Option<ExpectedCounts> = None;

    for (index, raw_line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if result.is_some() {
            return Err(ParseError::ResultNotAtEnd { line: line_number });
        }

        match parse_line(line, line_number)? {
            ParsedLine::Event(event) => events.push(event),
            ParsedLine::Result(counts) => result = Some(counts),
        }
    }

    match result {
        Some(counts) => Ok((events, counts)),
        None => Err(ParseError::MissingResult),
    }
}

/// Parse one non-empty line. `line_number` is 1-based and only used for
/// error reporting.
pub fn parse_line(line: &str, line_number: usize) -> Result<ParsedLine, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens[0] {
        "A" => parse_add(&tokens, line_number).map(ParsedLine::Event),
        "M" => parse_modify(&tokens, line_number).map(ParsedLine::Event),
        "C" => parse_cancel(&tokens, line_number).map(ParsedLine::Event),
        "R" => parse_result(&tokens, line_number).map(ParsedLine::Result),
        prefix => Err(ParseError::UnknownPrefix {
            line: line_number,
            prefix: prefix.to_string(),
        }),
    }
}

/// Format a trade for human-readable output:
/// `T <bid_id> <bid_price> <ask_id> <ask_price> <qty>`.
pub fn format_trade(trade: &Trade) -> String {
    format!(
        "T {} {} {} {} {}",
        trade.bid().order_id,
        trade.bid().price,
        trade.ask().order_id,
        trade.ask().price,
        trade.quantity()
    )
}

fn parse_add(tokens: &[&str], line: usize) -> Result<Event, ParseError> {
    expect_fields(tokens, 6, line)?;
    let side = parse_side(tokens[1], line)?;
    let order_type = parse_order_type(tokens[2], line)?;
    let price = parse_price(tokens[3], line)?;
    let quantity = parse_quantity(tokens[4], line)?;
    let id = parse_order_id(tokens[5], line)?;
    Ok(Event::Add {
        order_type,
        side,
        price,
        quantity,
        id,
    })
}

fn parse_modify(tokens: &[&str], line: usize) -> Result<Event, ParseError> {
    expect_fields(tokens, 5, line)?;
    let id = parse_order_id(tokens[1], line)?;
    let side = parse_side(tokens[2], line)?;
    let price = parse_price(tokens[3], line)?;
    let quantity = parse_quantity(tokens[4], line)?;
    Ok(Event::Modify {
        id,
        side,
        price,
        quantity,
    })
}

fn parse_cancel(tokens: &[&str], line: usize) -> Result<Event, ParseError> {
    expect_fields(tokens, 2, line)?;
    let id = parse_order_id(tokens[1], line)?;
    Ok(Event::Cancel { id })
}

fn parse_result(tokens: &[&str], line: usize) -> Result<ExpectedCounts, ParseError> {
    expect_fields(tokens, 4, line)?;
    Ok(ExpectedCounts {
        total: parse_count(tokens[1], line)?,
        bids: parse_count(tokens[2], line)?,
        asks: parse_count(tokens[3], line)?,
    })
}

fn expect_fields(tokens: &[&str], expected: usize, line: usize) -> Result<(), ParseError> {
    if tokens.len() != expected {
        return Err(ParseError::WrongFieldCount {
            line,
            expected,
            found: tokens.len(),
        });
    }
    Ok(())
}

fn parse_side(token: &str, line: usize) -> Result<Side, ParseError> {
    match token {
        "B" => Ok(Side::Buy),
        "S" => Ok(Side::Sell),
        _ => Err(ParseError::UnknownSide {
            line,
            token: token.to_string(),
        }),
    }
}

fn parse_order_type(token: &str, line: usize) -> Result<OrderType, ParseError> {
    match token {
        "GoodTillCancel" => Ok(OrderType::GoodTillCancel),
        "FillAndKill" => Ok(OrderType::FillAndKill),
        "FillOrKill" => Ok(OrderType::FillOrKill),
        "Market" => Ok(OrderType::Market),
        _ => Err(ParseError::UnknownOrderType {
            line,
            token: token.to_string(),
        }),
    }
}

/// All numerics are parsed as signed first so a leading `-` is reported
/// as a negative value rather than a bare parse failure.
fn parse_non_negative(token: &str, line: usize) -> Result<i64, ParseError> {
    let value: i64 = token.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })?;
    if value < 0 {
        return Err(ParseError::NegativeValue {
            line,
            token: token.to_string(),
        });
    }
    Ok(value)
}

fn parse_price(token: &str, line: usize) -> Result<Price, ParseError> {
    let value = parse_non_negative(token, line)?;
    Price::try_from(value).map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn parse_quantity(token: &str, line: usize) -> Result<Quantity, ParseError> {
    let value = parse_non_negative(token, line)?;
    let quantity = Quantity::try_from(value).map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })?;
    if quantity == 0 {
        return Err(ParseError::ZeroQuantity { line });
    }
    Ok(quantity)
}

fn parse_order_id(token: &str, line: usize) -> Result<OrderId, ParseError> {
    let value = parse_non_negative(token, line)?;
    Ok(value as OrderId)
}

fn parse_count(token: &str, line: usize) -> Result<usize, ParseError> {
    let value = parse_non_negative(token, line)?;
    usize::try_from(value).map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}
