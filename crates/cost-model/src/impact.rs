//! Market impact, Almgren-Chriss style
//!
//! ```text
//! temporary = sigma * sqrt(tau) * (quantity / depth) * price
//! permanent = permanent_ratio * temporary
//! total     = temporary + permanent
//! ```
//!
//! `depth` is the summed size of the top `depth_levels` on each side. When it
//! is smaller than the order itself, `quantity * thin_book_multiplier` is used.

use tracing::debug;

use tradesim_core::{ImpactConfig, ModelResult, OrderBookSnapshot};

use crate::inputs::{check_levels, non_negative, positive};

/// Fraction of notional returned when the inputs cannot be priced
pub const FALLBACK_IMPACT_RATE: f64 = 0.005;

/// Market impact with the default horizon (1/24 day) and permanent ratio (0.3)
pub fn market_impact(book: &OrderBookSnapshot, quantity: f64, volatility: f64, price: f64) -> f64 {
    market_impact_with(&ImpactConfig::default(), book, quantity, volatility, price)
}

pub fn market_impact_with(
    config: &ImpactConfig,
    book: &OrderBookSnapshot,
    quantity: f64,
    volatility: f64,
    price: f64,
) -> f64 {
    match try_impact(config, book, quantity, volatility, price) {
        Ok(impact) => impact,
        Err(e) => {
            debug!(error = %e, "Market impact fallback");
            let notional = quantity * price;
            if notional.is_finite() {
                (notional * FALLBACK_IMPACT_RATE).max(0.0)
            } else {
                0.0
            }
        }
    }
}

fn try_impact(
    config: &ImpactConfig,
    book: &OrderBookSnapshot,
    quantity: f64,
    volatility: f64,
    price: f64,
) -> ModelResult<f64> {
    let quantity = positive(quantity, "quantity")?;
    let volatility = non_negative(volatility, "volatility")?;
    let price = non_negative(price, "price")?;
    check_levels(book.bids(), config.depth_levels, "bids")?;
    check_levels(book.asks(), config.depth_levels, "asks")?;

    let mut depth = book.bid_depth(config.depth_levels) + book.ask_depth(config.depth_levels);
    if depth < quantity {
        depth = quantity * config.thin_book_multiplier;
    }

    let temporary = volatility * config.horizon_days.sqrt() * (quantity / depth) * price;
    let permanent = temporary * config.permanent_ratio;

    Ok(temporary + permanent)
}
