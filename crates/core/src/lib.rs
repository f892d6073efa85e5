//! Core types and utilities for the trade cost simulator
//!
//! This crate provides shared types used across all components:
//! - Order book snapshots and trade parameters
//! - Cost estimate and connection state types
//! - Configuration sections
//! - Error taxonomy
//! - Rolling latency windows and the performance monitor

pub mod types;
pub mod book;
pub mod config;
pub mod errors;
pub mod window;
pub mod monitor;

pub use types::*;
pub use book::*;
pub use config::*;
pub use errors::*;
pub use window::LatencyWindow;
pub use monitor::{PerformanceMonitor, PerformanceSnapshot, SeriesStats};
