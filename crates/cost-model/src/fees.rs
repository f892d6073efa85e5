//! Venue fee schedule and blended fee estimate

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use tradesim_core::{ModelError, ModelResult};

use crate::inputs::non_negative;

/// Flat rate applied to notional when the inputs cannot be priced
pub const FALLBACK_FEE_RATE: f64 = 0.001;

/// Maker and taker rates as fractions of notional
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRates {
    pub maker: f64,
    pub taker: f64,
}

impl FeeRates {
    pub const fn new(maker: f64, taker: f64) -> Self {
        Self { maker, taker }
    }

    /// `maker * split + taker * (1 - split)`
    pub fn blended(&self, maker_split: f64) -> f64 {
        self.maker * maker_split + self.taker * (1.0 - maker_split)
    }
}

/// OKX spot VIP tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeTier {
    Vip0,
    Vip1,
    Vip2,
    Vip3,
    Vip4,
    Vip5,
}

impl FeeTier {
    pub const LOWEST: FeeTier = FeeTier::Vip0;

    pub fn name(&self) -> &'static str {
        match self {
            FeeTier::Vip0 => "VIP0",
            FeeTier::Vip1 => "VIP1",
            FeeTier::Vip2 => "VIP2",
            FeeTier::Vip3 => "VIP3",
            FeeTier::Vip4 => "VIP4",
            FeeTier::Vip5 => "VIP5",
        }
    }

    /// Case-insensitive; `None` for anything outside the schedule
    pub fn parse(id: &str) -> Option<FeeTier> {
        match id.trim().to_ascii_uppercase().as_str() {
            "VIP0" => Some(FeeTier::Vip0),
            "VIP1" => Some(FeeTier::Vip1),
            "VIP2" => Some(FeeTier::Vip2),
            "VIP3" => Some(FeeTier::Vip3),
            "VIP4" => Some(FeeTier::Vip4),
            "VIP5" => Some(FeeTier::Vip5),
            _ => None,
        }
    }

    pub fn okx_rates(&self) -> FeeRates {
        match self {
            FeeTier::Vip0 => FeeRates::new(0.0008, 0.0010),
            FeeTier::Vip1 => FeeRates::new(0.0007, 0.0009),
            FeeTier::Vip2 => FeeRates::new(0.0006, 0.0008),
            FeeTier::Vip3 => FeeRates::new(0.0005, 0.0007),
            FeeTier::Vip4 => FeeRates::new(0.0003, 0.0005),
            FeeTier::Vip5 => FeeRates::new(0.0000, 0.0003),
        }
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rates for `(venue, tier)`. Any unmatched venue or tier gets the lowest
/// tier's rates.
pub fn fee_rates(venue: &str, tier: &str) -> FeeRates {
    let lowest = FeeTier::LOWEST.okx_rates();

    if !venue.trim().eq_ignore_ascii_case("okx") {
        return lowest;
    }

    FeeTier::parse(tier).map_or(lowest, |t| t.okx_rates())
}

/// Fee for `quantity` at `price` with the given expected maker share.
///
/// Falls back to `quantity * price * 0.001` when the split is outside [0, 1]
/// or an input is not a finite non-negative number.
pub fn fees(venue: &str, tier: &str, quantity: f64, price: f64, maker_split: f64) -> f64 {
    match try_fees(venue, tier, quantity, price, maker_split) {
        Ok(fee) => fee,
        Err(e) => {
            debug!(error = %e, "Fee fallback");
            let notional = quantity * price;
            if notional.is_finite() {
                (notional * FALLBACK_FEE_RATE).max(0.0)
            } else {
                0.0
            }
        }
    }
}

fn try_fees(
    venue: &str,
    tier: &str,
    quantity: f64,
    price: f64,
    maker_split: f64,
) -> ModelResult<f64> {
    let quantity = non_negative(quantity, "quantity")?;
    let price = non_negative(price, "price")?;
    if !(0.0..=1.0).contains(&maker_split) {
        return Err(ModelError::InvalidInput(format!(
            "maker split must be within [0, 1], got {maker_split}"
        )));
    }

    let rate = fee_rates(venue, tier).blended(maker_split);
    Ok(quantity * price * rate)
}
