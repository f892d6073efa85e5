//! Transaction cost estimation
//!
//! Pure functions of (order book snapshot, trade parameters). None of them
//! fail: malformed or insufficient input yields a documented fallback value.
//!
//! - Slippage from walking the ask side
//! - Fees from a fixed venue/tier schedule
//! - Almgren-Chriss style market impact
//! - Logistic maker/taker split

pub mod fees;
pub mod impact;
pub mod maker_taker;
pub mod model;
pub mod slippage;

mod inputs;

pub use fees::{fee_rates, fees, FeeRates, FeeTier};
pub use impact::{market_impact, market_impact_with};
pub use maker_taker::maker_taker_split;
pub use model::{CostBreakdown, CostModel};
pub use slippage::slippage;
