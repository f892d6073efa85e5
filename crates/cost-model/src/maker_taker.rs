//! Expected maker share of a fill
//!
//! `p = 1 / (1 + exp(5 * (spread - 0.001) - imbalance))`, clamped to
//! [0, 0.8], where `spread = (ask - bid) / bid` and `imbalance` is the
//! bid/ask volume imbalance over the top five levels.

use tracing::debug;

use tradesim_core::{ModelError, ModelResult, OrderBookSnapshot};

use crate::inputs::{check_levels, non_negative, top_of_book};

/// Some of the order always crosses the spread
pub const MAX_MAKER_PROPORTION: f64 = 0.8;
pub const FALLBACK_MAKER_PROPORTION: f64 = 0.2;

const SPREAD_SENSITIVITY: f64 = 5.0;
const SPREAD_PIVOT: f64 = 0.001;
const IMBALANCE_LEVELS: usize = 5;

/// Zero for a book with an empty side; 0.2 when the book is unusable
pub fn maker_taker_split(book: &OrderBookSnapshot, quantity: f64) -> f64 {
    if book.bids().is_empty() || book.asks().is_empty() {
        return 0.0;
    }

    match logistic_split(book, quantity) {
        Ok(p) => p.clamp(0.0, MAX_MAKER_PROPORTION),
        Err(e) => {
            debug!(error = %e, "Maker/taker fallback");
            FALLBACK_MAKER_PROPORTION
        }
    }
}

fn logistic_split(book: &OrderBookSnapshot, quantity: f64) -> ModelResult<f64> {
    non_negative(quantity, "quantity")?;
    let (bid, ask) = top_of_book(book)?;
    check_levels(book.bids(), IMBALANCE_LEVELS, "bids")?;
    check_levels(book.asks(), IMBALANCE_LEVELS, "asks")?;

    if bid.price <= 0.0 {
        return Err(ModelError::InvalidInput("best bid is zero".to_string()));
    }
    let spread = (ask.price - bid.price) / bid.price;

    let bid_volume = book.bid_depth(IMBALANCE_LEVELS);
    let ask_volume = book.ask_depth(IMBALANCE_LEVELS);
    let total = bid_volume + ask_volume;
    let imbalance = if total == 0.0 {
        0.0
    } else {
        (bid_volume - ask_volume) / total
    };

    Ok(1.0 / (1.0 + (SPREAD_SENSITIVITY * (spread - SPREAD_PIVOT) - imbalance).exp()))
}
