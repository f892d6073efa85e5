//! Thread-safe latency recorder
//!
//! Three independent series, each behind its own lock. Readers copy the
//! buffer under the lock and compute statistics after releasing it, so a
//! snapshot never holds up recorders longer than the copy.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::window::LatencyWindow;

pub const DEFAULT_MONITOR_WINDOW: usize = 1_000;

/// Point-in-time statistics for one series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: Duration,
    pub max: Duration,
    pub last: Option<Duration>,
}

impl SeriesStats {
    fn from_window(window: &LatencyWindow) -> Self {
        Self {
            count: window.len(),
            mean: window.average(),
            max: window.max(),
            last: window.latest(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub processing: SeriesStats,
    pub refresh: SeriesStats,
    pub network: SeriesStats,
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    processing: Mutex<LatencyWindow>,
    refresh: Mutex<LatencyWindow>,
    network: Mutex<LatencyWindow>,
}

impl PerformanceMonitor {
    pub fn new(window: usize) -> Self {
        Self {
            processing: Mutex::new(LatencyWindow::new(window)),
            refresh: Mutex::new(LatencyWindow::new(window)),
            network: Mutex::new(LatencyWindow::new(window)),
        }
    }

    /// Time spent decoding and publishing one feed message
    pub fn record_processing(&self, elapsed: Duration) {
        self.processing.lock().push(elapsed);
    }

    pub fn record_processing_since(&self, started: Instant) {
        self.record_processing(started.elapsed());
    }

    /// Time spent on one presentation refresh (orchestration cycle)
    pub fn record_refresh(&self, elapsed: Duration) {
        self.refresh.lock().push(elapsed);
    }

    /// Delay between the venue stamping a message and us receiving it
    pub fn record_network_latency(&self, latency: Duration) {
        self.network.lock().push(latency);
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let processing = self.processing.lock().clone();
        let refresh = self.refresh.lock().clone();
        let network = self.network.lock().clone();

        PerformanceSnapshot {
            processing: SeriesStats::from_window(&processing),
            refresh: SeriesStats::from_window(&refresh),
            network: SeriesStats::from_window(&network),
        }
    }

    pub fn reset(&self) {
        self.processing.lock().clear();
        self.refresh.lock().clear();
        self.network.lock().clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MONITOR_WINDOW)
    }
}
