//! Core type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order types accepted by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

impl OrderType {
    pub fn name(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self, OrderType::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "stop" => Ok(OrderType::Stop),
            other => Err(format!("unknown order type: {other}")),
        }
    }
}

/// Hypothetical order the simulator prices. Supplied externally, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeParameters {
    pub venue: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub quantity: f64,
    /// Fractional volatility over the impact horizon (0.02 = 2%)
    pub volatility: f64,
    pub fee_tier: String,
}

impl Default for TradeParameters {
    fn default() -> Self {
        Self {
            venue: "okx".to_string(),
            symbol: "BTC-USDT-SWAP".to_string(),
            order_type: OrderType::Market,
            quantity: 100.0,
            volatility: 0.02,
            fee_tier: "VIP0".to_string(),
        }
    }
}

/// Feed connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationState {
    Idle,
    Running,
}

/// One cycle's cost figures. Produced fresh every cycle, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub symbol: String,
    pub sequence: u64,
    pub mid_price: f64,
    /// Fraction of mid (0.005 = 0.5%)
    pub slippage: f64,
    pub fees: f64,
    pub market_impact: f64,
    /// Expected maker share of the fill, in [0, 0.8]
    pub maker_proportion: f64,
    pub net_cost: f64,
    /// Wall time of the computation cycle that produced this estimate
    pub latency_us: u64,
    /// Rolling average decode time on the ingestion path
    pub decode_latency_us: u64,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_parsing() {
        assert_eq!("market".parse::<OrderType>().unwrap(), OrderType::Market);
        assert_eq!(" Limit ".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert!("iceberg".parse::<OrderType>().is_err());
        assert!(OrderType::Market.is_market());
        assert!(!OrderType::Stop.is_market());
    }

    #[test]
    fn test_trade_parameters_deserialize_with_defaults() {
        let params: TradeParameters =
            serde_json::from_str(r#"{"symbol":"ETH-USDT","order_type":"limit"}"#).unwrap();
        assert_eq!(params.symbol, "ETH-USDT");
        assert_eq!(params.order_type, OrderType::Limit);
        assert_eq!(params.venue, "okx");
        assert_eq!(params.fee_tier, "VIP0");
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(
            serde_json::to_string(&ConnectionState::Disconnected).unwrap(),
            "\"disconnected\""
        );
    }
}
