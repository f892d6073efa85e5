//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::TradeParameters;

/// Feed endpoint and reconnection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Base of the endpoint; venue and symbol are appended as path segments
    pub base_url: String,
    pub reconnect_delay_ms: u64,
    /// Upper bound on how long `stop()` waits for the ingestion task
    pub stop_timeout_ms: u64,
    /// Samples kept by the per-connection decode latency buffer
    pub decode_window: usize,
    /// Text frame sent after every (re)connect, if the venue needs one
    pub subscribe_message: Option<String>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            base_url: "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook".to_string(),
            reconnect_delay_ms: 5_000,
            stop_timeout_ms: 1_000,
            decode_window: 100,
            subscribe_message: None,
        }
    }
}

impl FeedSettings {
    /// `{base_url}/{venue}/{symbol}`, venue lower-cased
    pub fn endpoint(&self, venue: &str, symbol: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            venue.trim().to_ascii_lowercase(),
            symbol.trim()
        )
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Market impact constants. Heuristic values kept for compatibility with
/// previously displayed figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Execution horizon as a fraction of a trading day
    pub horizon_days: f64,
    /// Permanent impact as a multiple of temporary impact
    pub permanent_ratio: f64,
    /// Levels summed per side when measuring depth
    pub depth_levels: usize,
    /// When depth < quantity, depth is replaced by quantity * this
    pub thin_book_multiplier: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            horizon_days: 1.0 / 24.0,
            permanent_ratio: 0.3,
            depth_levels: 10,
            thin_book_multiplier: 100.0,
        }
    }
}

/// Complete simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub feed: FeedSettings,
    pub impact: ImpactConfig,
    pub trade: TradeParameters,
    pub cycle_interval_ms: u64,
    pub monitor_window: usize,
    pub event_buffer: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            impact: ImpactConfig::default(),
            trade: TradeParameters::default(),
            cycle_interval_ms: 100,
            monitor_window: 1_000,
            event_buffer: 256,
        }
    }
}

impl SimulatorConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }
}
