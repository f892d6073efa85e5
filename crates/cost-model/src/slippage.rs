//! Expected slippage of a market buy

use tracing::debug;

use tradesim_core::{ModelResult, OrderBookSnapshot, OrderType};

use crate::inputs::{check_levels, positive, top_of_book};

/// Returned when the ask side cannot fill the whole quantity
pub const INSUFFICIENT_DEPTH_SLIPPAGE: f64 = 0.02;
/// Returned for a book that is one-sided, crossed or has unusable levels
pub const MALFORMED_BOOK_SLIPPAGE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fill {
    Complete { vwap: f64, mid: f64 },
    Partial { filled: f64 },
}

/// Slippage as a fraction of mid price.
///
/// Zero for non-market orders. A market buy walks the asks from the best
/// price up; the result is `(vwap - mid) / mid`, floored at zero.
pub fn slippage(book: &OrderBookSnapshot, quantity: f64, order_type: OrderType) -> f64 {
    if !order_type.is_market() {
        return 0.0;
    }

    match walk_asks(book, quantity) {
        Ok(Fill::Complete { vwap, mid }) => ((vwap - mid) / mid).max(0.0),
        Ok(Fill::Partial { filled }) => {
            debug!(quantity, filled, "Ask side exhausted, using depth fallback");
            INSUFFICIENT_DEPTH_SLIPPAGE
        }
        Err(e) => {
            debug!(error = %e, "Slippage fallback");
            MALFORMED_BOOK_SLIPPAGE
        }
    }
}

fn walk_asks(book: &OrderBookSnapshot, quantity: f64) -> ModelResult<Fill> {
    let quantity = positive(quantity, "quantity")?;
    let (bid, ask) = top_of_book(book)?;
    check_levels(book.asks(), usize::MAX, "asks")?;

    let mid = (bid.price + ask.price) / 2.0;

    let mut filled = 0.0;
    let mut cost = 0.0;
    for level in book.asks() {
        if filled + level.size >= quantity {
            cost += (quantity - filled) * level.price;
            filled = quantity;
            break;
        }
        cost += level.size * level.price;
        filled += level.size;
    }

    if filled < quantity {
        return Ok(Fill::Partial { filled });
    }

    Ok(Fill::Complete {
        vwap: cost / quantity,
        mid,
    })
}
