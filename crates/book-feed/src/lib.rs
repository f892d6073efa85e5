//! Live depth-of-book feed
//!
//! Features:
//! - WebSocket connection to a single venue/symbol order book stream
//! - Per-frame decoding into immutable snapshots; bad frames are skipped
//! - Unbounded reconnect with fixed backoff, cancellable by `stop()`
//! - Latest-snapshot slot for single-writer / latest-reader handoff
//! - Rolling decode latency and connection state telemetry

pub mod decode;
pub mod feeds;
pub mod state;

pub use decode::decode_book;
pub use feeds::{FeedConfig, FeedConnection, MarketFeed, SnapshotHandler};
pub use state::{FeedStats, FeedTelemetry, SnapshotSlot};
