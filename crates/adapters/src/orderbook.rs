//! Conversion of raw venue depth into numeric order-book levels
//!
//! Venues deliver levels as `[price, amount]` arrays of strings or numbers. A field
//! that cannot be converted becomes `0.0` and is logged as partial data; the rest of
//! the snapshot is kept. Level order is preserved as delivered.

use crate::currency::CurrencyPair;
use crate::traits::OrderBookLevel;
use serde_json::Value;
use std::fmt;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookSide {
    Bid,
    Ask,
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSide::Bid => write!(f, "bid"),
            BookSide::Ask => write!(f, "ask"),
        }
    }
}

/// Converts raw `[price, amount]` levels, zeroing any field that fails to parse
pub fn convert_levels(
    venue: &str,
    pair: &CurrencyPair,
    side: BookSide,
    raw: &[Vec<Value>],
) -> Vec<OrderBookLevel> {
    raw.iter()
        .enumerate()
        .map(|(index, level)| OrderBookLevel {
            price: field_or_zero(venue, pair, side, index, "price", level.first()),
            amount: field_or_zero(venue, pair, side, index, "amount", level.get(1)),
        })
        .collect()
}

fn field_or_zero(
    venue: &str,
    pair: &CurrencyPair,
    side: BookSide,
    index: usize,
    field: &'static str,
    value: Option<&Value>,
) -> f64 {
    match parse_number(value) {
        Ok(number) => number,
        Err(reason) => {
            warn!(
                venue = %venue,
                pair = %pair,
                side = %side,
                level = index,
                field,
                raw = ?value,
                "Partial order book data: {}, substituting zero",
                reason
            );
            0.0
        }
    }
}

/// Converts a single market-data field (ticker, balance), zeroing it on failure
pub fn number_or_zero(venue: &str, pair: &CurrencyPair, field: &'static str, value: Option<&Value>) -> f64 {
    match parse_number(value) {
        Ok(number) => number,
        Err(reason) => {
            warn!(
                venue = %venue,
                pair = %pair,
                field,
                raw = ?value,
                "Partial market data: {}, substituting zero",
                reason
            );
            0.0
        }
    }
}

/// Parses a JSON string or number into a finite `f64`
pub fn parse_number(value: Option<&Value>) -> Result<f64, String> {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| format!("unrepresentable number {}", n))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid decimal '{}': {}", s, e))?,
        Some(other) => return Err(format!("unexpected value {}", other)),
        None => return Err("missing field".to_string()),
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(format!("non-finite value {}", number))
    }
}
