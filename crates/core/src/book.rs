//! Normalized order book snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single (price, size) level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

impl PriceLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }

    pub fn is_finite(&self) -> bool {
        self.price.is_finite() && self.size.is_finite()
    }
}

impl From<(f64, f64)> for PriceLevel {
    fn from((price, size): (f64, f64)) -> Self {
        Self { price, size }
    }
}

/// Immutable view of one feed update.
///
/// Bids are best-first (descending), asks are best-first (ascending). The
/// ordering is taken as delivered; a crossed or empty book is kept as-is and
/// left for consumers to reject.
#[derive(Debug, Clone)]
pub struct OrderBookSnapshot {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    symbol: Option<String>,
    exchange: Option<String>,
    exchange_time: Option<DateTime<Utc>>,
    sequence: u64,
}

impl OrderBookSnapshot {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            bids,
            asks,
            symbol: None,
            exchange: None,
            exchange_time: None,
            sequence: 0,
        }
    }

    /// Build from plain `(price, size)` tuples, mostly for tests and fixtures
    pub fn from_levels(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> Self {
        Self::new(
            bids.iter().copied().map(PriceLevel::from).collect(),
            asks.iter().copied().map(PriceLevel::from).collect(),
        )
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_exchange_time(mut self, ts: DateTime<Utc>) -> Self {
        self.exchange_time = Some(ts);
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }

    pub fn exchange_time(&self) -> Option<DateTime<Utc>> {
        self.exchange_time
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }


    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// True when both sides exist and best bid >= best ask
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Both sides present, every level finite, top of book uncrossed
    pub fn is_valid(&self) -> bool {
        !self.bids.is_empty()
            && !self.asks.is_empty()
            && self.bids.iter().chain(self.asks.iter()).all(PriceLevel::is_finite)
            && !self.is_crossed()
    }

    /// Average of best bid and best ask; `None` for a one-sided or crossed book
    pub fn mid_price(&self) -> Option<f64> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        if !bid.is_finite() || !ask.is_finite() || bid.price >= ask.price {
            return None;
        }
        Some((bid.price + ask.price) / 2.0)
    }

    pub fn spread(&self) -> Option<f64> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.price - bid.price)
    }

    /// Summed size of the first `levels` bids
    pub fn bid_depth(&self, levels: usize) -> f64 {
        self.bids.iter().take(levels).map(|l| l.size).sum()
    }

    /// Summed size of the first `levels` asks
    pub fn ask_depth(&self, levels: usize) -> f64 {
        self.asks.iter().take(levels).map(|l| l.size).sum()
    }
}
