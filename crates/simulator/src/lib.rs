//! Trade cost simulator
//!
//! Ties the live book feed to the cost model on a fixed cadence and emits a
//! fresh `CostEstimate` every cycle to whatever presentation layer is
//! listening on the event channel.

pub mod logging;
pub mod orchestrator;
pub mod settings;

pub use orchestrator::{
    compute_estimate, net_cost, FeedConnector, Simulator, SimulatorEvent, WebSocketConnector,
};
pub use settings::load_config;
