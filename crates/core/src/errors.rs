//! Error types

use thiserror::Error;

/// Feed connection errors
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Feed already running")]
    AlreadyRunning,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Cost model input errors. Never leave the model: every public estimator
/// maps them to its fallback value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Order book side missing: {0}")]
    MissingSide(&'static str),

    #[error("Crossed order book: bid {bid} >= ask {ask}")]
    CrossedBook { bid: f64, ask: f64 },

    #[error("Non-finite or negative level in {0} side")]
    NonFiniteLevel(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Simulation already running")]
    AlreadyRunning,

    #[error("Simulation not running")]
    NotRunning,

    #[error("Order book unusable: {0}")]
    InvalidBook(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Result type alias
pub type FeedResult<T> = Result<T, FeedError>;
pub type ModelResult<T> = Result<T, ModelError>;
pub type SimulatorResult<T> = Result<T, SimulatorError>;
