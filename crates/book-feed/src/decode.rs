//! Feed frame decoding
//!
//! Expected payload:
//! `{"timestamp": "...", "exchange": "okx", "symbol": "BTC-USDT-SWAP",
//!   "asks": [["95445.5", "9.06"], ...], "bids": [["95445.4", "1104.23"], ...]}`
//!
//! Only `asks` and `bids` are required. Levels are best-first on both sides.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use tradesim_core::{FeedError, FeedResult, OrderBookSnapshot, PriceLevel};

#[derive(Debug, Deserialize)]
struct RawBook {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    asks: Vec<Vec<Value>>,
    bids: Vec<Vec<Value>>,
}

/// Decode one text frame into a snapshot stamped with `sequence`
pub fn decode_book(text: &str, sequence: u64) -> FeedResult<OrderBookSnapshot> {
    let raw: RawBook =
        serde_json::from_str(text).map_err(|e| FeedError::InvalidMessage(e.to_string()))?;

    let bids = parse_side(&raw.bids, "bids")?;
    let asks = parse_side(&raw.asks, "asks")?;

    let mut snapshot = OrderBookSnapshot::new(bids, asks).with_sequence(sequence);

    if let Some(symbol) = raw.symbol {
        snapshot = snapshot.with_symbol(symbol);
    }
    if let Some(exchange) = raw.exchange {
        snapshot = snapshot.with_exchange(exchange);
    }
    // A bad timestamp costs us the network latency sample, not the frame
    if let Some(ts) = raw.timestamp.as_deref().and_then(parse_timestamp) {
        snapshot = snapshot.with_exchange_time(ts);
    }

    Ok(snapshot)
}

fn parse_side(levels: &[Vec<Value>], side: &str) -> FeedResult<Vec<PriceLevel>> {
    levels
        .iter()
        .enumerate()
        .map(|(i, level)| {
            let (price, size) = match level.as_slice() {
                [price, size, ..] => (parse_number(price), parse_number(size)),
                _ => (None, None),
            };

            match (price, size) {
                (Some(price), Some(size)) => Ok(PriceLevel::new(price, size)),
                _ => Err(FeedError::InvalidMessage(format!(
                    "{side}[{i}] is not a [price, size] pair: {level:?}"
                ))),
            }
        })
        .collect()
}

/// Strings are the canonical encoding; bare JSON numbers are accepted too.
/// Non-finite and negative values are rejected.
fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}
