//! Input checks shared by the estimators

use tradesim_core::{ModelError, ModelResult, OrderBookSnapshot, PriceLevel};

/// Best bid and best ask of a two-sided, finite, uncrossed book
pub(crate) fn top_of_book(book: &OrderBookSnapshot) -> ModelResult<(PriceLevel, PriceLevel)> {
    let bid = book.best_bid().ok_or(ModelError::MissingSide("bids"))?;
    let ask = book.best_ask().ok_or(ModelError::MissingSide("asks"))?;

    if !usable(&bid) {
        return Err(ModelError::NonFiniteLevel("bids"));
    }
    if !usable(&ask) {
        return Err(ModelError::NonFiniteLevel("asks"));
    }
    if bid.price >= ask.price {
        return Err(ModelError::CrossedBook {
            bid: bid.price,
            ask: ask.price,
        });
    }

    Ok((bid, ask))
}

/// Every level among the first `levels` is finite and non-negative
pub(crate) fn check_levels(
    side: &[PriceLevel],
    levels: usize,
    name: &'static str,
) -> ModelResult<()> {
    if side.iter().take(levels).all(usable) {
        Ok(())
    } else {
        Err(ModelError::NonFiniteLevel(name))
    }
}

pub(crate) fn positive(value: f64, name: &str) -> ModelResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::InvalidInput(format!("{name} must be positive, got {value}")))
    }
}

pub(crate) fn non_negative(value: f64, name: &str) -> ModelResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ModelError::InvalidInput(format!("{name} must be non-negative, got {value}")))
    }
}

fn usable(level: &PriceLevel) -> bool {
    level.is_finite() && level.price >= 0.0 && level.size >= 0.0
}
