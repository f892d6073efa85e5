//! Shared feed state
//!
//! `SnapshotSlot` is the single-slot mailbox between ingestion and the
//! orchestration cycle. Publication swaps an `Arc` under a write lock that is
//! held only for the pointer swap; readers clone the `Arc` and compute
//! outside the lock, so a reader never sees a partially built book.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use tradesim_core::{ConnectionState, LatencyWindow, OrderBookSnapshot};

use crate::feeds::SnapshotHandler;

/// Latest published snapshot
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    latest: RwLock<Option<Arc<OrderBookSnapshot>>>,
    published: AtomicU64,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot wholesale
    pub fn publish(&self, snapshot: Arc<OrderBookSnapshot>) {
        *self.latest.write() = Some(snapshot);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latest(&self) -> Option<Arc<OrderBookSnapshot>> {
        self.latest.read().clone()
    }

    pub fn clear(&self) {
        *self.latest.write() = None;
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl SnapshotHandler for SnapshotSlot {
    fn on_snapshot(&self, snapshot: Arc<OrderBookSnapshot>) {
        self.publish(snapshot);
    }
}

/// Cloneable view of a feed's connection state and decode statistics.
///
/// The decode latency buffer is local to one feed connection and separate
/// from the process-level `PerformanceMonitor`.
#[derive(Debug, Clone)]
pub struct FeedTelemetry {
    state: Arc<RwLock<ConnectionState>>,
    decode_latency: Arc<Mutex<LatencyWindow>>,
    messages: Arc<AtomicU64>,
    decode_errors: Arc<AtomicU64>,
    reconnects: Arc<AtomicU64>,
}

impl FeedTelemetry {
    pub fn new(decode_window: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            decode_latency: Arc::new(Mutex::new(LatencyWindow::new(decode_window))),
            messages: Arc::new(AtomicU64::new(0)),
            decode_errors: Arc::new(AtomicU64::new(0)),
            reconnects: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Returns true when the state actually changed
    pub fn set_state(&self, next: ConnectionState) -> bool {
        let mut state = self.state.write();
        if *state == next {
            return false;
        }
        let prev = std::mem::replace(&mut *state, next);
        debug!(from = %prev, to = %next, "Feed state transition");
        true
    }

    pub fn record_decode(&self, elapsed: Duration) {
        self.decode_latency.lock().push(elapsed);
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Mean over the last `decode_window` decodes, zero before the first one
    pub fn average_decode_latency(&self) -> Duration {
        self.decode_latency.lock().average()
    }

    pub fn stats(&self) -> FeedStats {
        FeedStats {
            state: self.state(),
            messages: self.messages.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            average_decode_latency: self.average_decode_latency(),
        }
    }
}

impl Default for FeedTelemetry {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Statistics about a feed connection
#[derive(Debug, Clone)]
pub struct FeedStats {
    pub state: ConnectionState,
    pub messages: u64,
    pub decode_errors: u64,
    pub reconnects: u64,
    pub average_decode_latency: Duration,
}
