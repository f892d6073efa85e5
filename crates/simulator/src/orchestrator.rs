//! Simulation orchestrator
//!
//! `start_simulation` opens a feed for the requested venue/symbol and starts
//! a fixed-cadence cycle. Each tick reads whatever snapshot is currently
//! published, prices it outside any lock and emits a `CostEstimate`. A tick
//! that cannot produce an estimate is logged and skipped; the cycle keeps
//! running regardless.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use tradesim_book_feed::{
    FeedConfig, FeedConnection, FeedStats, FeedTelemetry, MarketFeed, SnapshotHandler, SnapshotSlot,
};
use tradesim_core::{
    ConnectionState, CostEstimate, OrderBookSnapshot, PerformanceMonitor, PerformanceSnapshot,
    SimulationState, SimulatorConfig, SimulatorError, SimulatorResult, TradeParameters,
};
use tradesim_cost_model::CostModel;

/// What the presentation layer receives
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SimulatorEvent {
    Estimate(CostEstimate),
    /// Connection state changes; `Disconnected` is the last event of a run
    Status(ConnectionState),
}

/// Builds the feed for a simulation run
pub trait FeedConnector: Send + Sync {
    fn connect(
        &self,
        config: FeedConfig,
        handler: Arc<dyn SnapshotHandler>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Box<dyn MarketFeed>;
}

/// Live WebSocket feeds
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl FeedConnector for WebSocketConnector {
    fn connect(
        &self,
        config: FeedConfig,
        handler: Arc<dyn SnapshotHandler>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Box<dyn MarketFeed> {
        Box::new(FeedConnection::new(config, handler).with_monitor(monitor))
    }
}

/// `quantity * mid * (1 + slippage) + fees + market_impact`
pub fn net_cost(
    quantity: f64,
    mid_price: f64,
    slippage: f64,
    fees: f64,
    market_impact: f64,
) -> f64 {
    quantity * mid_price * (1.0 + slippage) + fees + market_impact
}

/// Price one snapshot. Fails only when the book has no usable mid price.
pub fn compute_estimate(
    model: &CostModel,
    book: &OrderBookSnapshot,
    params: &TradeParameters,
    started: Instant,
    decode_latency: Duration,
) -> SimulatorResult<CostEstimate> {
    let mid_price = book.mid_price().ok_or_else(|| {
        SimulatorError::InvalidBook(format!(
            "no mid price (bids={}, asks={}, crossed={})",
            book.bids().len(),
            book.asks().len(),
            book.is_crossed()
        ))
    })?;

    let costs = model.breakdown(book, params, mid_price);
    let net_cost = net_cost(
        params.quantity,
        mid_price,
        costs.slippage,
        costs.fees,
        costs.market_impact,
    );

    Ok(CostEstimate {
        symbol: book.symbol().unwrap_or(&params.symbol).to_string(),
        sequence: book.sequence(),
        mid_price,
        slippage: costs.slippage,
        fees: costs.fees,
        market_impact: costs.market_impact,
        maker_proportion: costs.maker_proportion,
        net_cost,
        latency_us: started.elapsed().as_micros() as u64,
        decode_latency_us: decode_latency.as_micros() as u64,
        computed_at: Utc::now(),
    })
}

/// A running simulation
struct Session {
    feed: Box<dyn MarketFeed>,
    slot: Arc<SnapshotSlot>,
    params: Arc<RwLock<TradeParameters>>,
    shutdown: oneshot::Sender<()>,
    cycle: JoinHandle<()>,
}

/// Main orchestrator
pub struct Simulator {
    config: SimulatorConfig,
    model: Arc<CostModel>,
    monitor: Arc<PerformanceMonitor>,
    connector: Arc<dyn FeedConnector>,
    events_tx: mpsc::Sender<SimulatorEvent>,
    events_rx: Option<mpsc::Receiver<SimulatorEvent>>,
    session: Option<Session>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    pub fn with_connector(config: SimulatorConfig, connector: Arc<dyn FeedConnector>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));

        Self {
            model: Arc::new(CostModel::new(config.impact)),
            monitor: Arc::new(PerformanceMonitor::new(config.monitor_window)),
            config,
            connector,
            events_tx,
            events_rx: Some(events_rx),
            session: None,
        }
    }

    /// Get event receiver (can only be taken once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<SimulatorEvent>> {
        self.events_rx.take()
    }

    pub fn state(&self) -> SimulationState {
        if self.session.is_some() {
            SimulationState::Running
        } else {
            SimulationState::Idle
        }
    }

    /// Idle -> Running
    pub fn start_simulation(&mut self, params: TradeParameters) -> SimulatorResult<()> {
        if self.session.is_some() {
            return Err(SimulatorError::AlreadyRunning);
        }

        let feed_config =
            FeedConfig::from_settings(&self.config.feed, &params.venue, &params.symbol);
        let slot = Arc::new(SnapshotSlot::new());
        let mut feed = self.connector.connect(
            feed_config,
            Arc::clone(&slot) as Arc<dyn SnapshotHandler>,
            Arc::clone(&self.monitor),
        );
        feed.start()?;

        info!(
            endpoint = %feed.endpoint(),
            symbol = %params.symbol,
            order_type = %params.order_type,
            quantity = params.quantity,
            "Simulation started"
        );

        let params = Arc::new(RwLock::new(params));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let cycle = Cycle {
            model: Arc::clone(&self.model),
            monitor: Arc::clone(&self.monitor),
            slot: Arc::clone(&slot),
            params: Arc::clone(&params),
            telemetry: feed.telemetry(),
            events: self.events_tx.clone(),
            interval: self.config.cycle_interval().max(Duration::from_millis(1)),
        };

        self.session = Some(Session {
            feed,
            slot,
            params,
            shutdown: shutdown_tx,
            cycle: tokio::spawn(cycle.run(shutdown_rx)),
        });

        Ok(())
    }

    /// Running -> Idle. Emits a final `Status(Disconnected)`.
    pub async fn stop_simulation(&mut self) -> SimulatorResult<()> {
        let mut session = self.session.take().ok_or(SimulatorError::NotRunning)?;

        let _ = session.shutdown.send(());
        if let Err(e) = (&mut session.cycle).await {
            warn!(error = %e, "Refresh cycle ended abnormally");
        }
        session.feed.stop().await;

        // A full, undrained buffer must not hold up shutdown
        let terminal = SimulatorEvent::Status(ConnectionState::Disconnected);
        match tokio::time::timeout(self.config.feed.stop_timeout(), self.events_tx.send(terminal))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!("Event receiver dropped"),
            Err(_) => warn!("Event buffer full, terminal status dropped"),
        }

        info!("Simulation stopped");
        Ok(())
    }

    /// Takes effect on the next tick. Venue and symbol are bound to the open
    /// feed and only change on the next `start_simulation`.
    pub fn update_parameters(&self, params: TradeParameters) -> SimulatorResult<()> {
        let session = self.session.as_ref().ok_or(SimulatorError::NotRunning)?;

        {
            let current = session.params.read();
            if current.venue != params.venue || current.symbol != params.symbol {
                warn!(
                    venue = %params.venue,
                    symbol = %params.symbol,
                    "Venue/symbol change ignored until restart"
                );
            }
        }

        let mut current = session.params.write();
        let (venue, symbol) = (current.venue.clone(), current.symbol.clone());
        *current = TradeParameters { venue, symbol, ..params };
        Ok(())
    }

    pub fn parameters(&self) -> Option<TradeParameters> {
        self.session.as_ref().map(|s| s.params.read().clone())
    }

    pub fn latest_snapshot(&self) -> Option<Arc<OrderBookSnapshot>> {
        self.session.as_ref().and_then(|s| s.slot.latest())
    }

    pub fn performance(&self) -> PerformanceSnapshot {
        self.monitor.snapshot()
    }

    pub fn feed_stats(&self) -> Option<FeedStats> {
        self.session.as_ref().map(|s| s.feed.telemetry().stats())
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.shutdown.send(());
            session.cycle.abort();
        }
    }
}

/// Fixed-cadence refresh loop
struct Cycle {
    model: Arc<CostModel>,
    monitor: Arc<PerformanceMonitor>,
    slot: Arc<SnapshotSlot>,
    params: Arc<RwLock<TradeParameters>>,
    telemetry: FeedTelemetry,
    events: mpsc::Sender<SimulatorEvent>,
    interval: Duration,
}

impl Cycle {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_state = None;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if !isolate_tick(|| self.tick(&mut last_state)) {
                        error!("Refresh tick panicked, cycle continues");
                    }
                }
            }
        }

        debug!("Refresh cycle exited");
    }

    fn tick(&self, last_state: &mut Option<ConnectionState>) {
        let started = Instant::now();

        let state = self.telemetry.state();
        if *last_state != Some(state) {
            *last_state = Some(state);
            self.emit(SimulatorEvent::Status(state));
        }

        let Some(book) = self.slot.latest() else {
            debug!("No snapshot published yet");
            return;
        };
        let params = self.params.read().clone();

        match compute_estimate(
            &self.model,
            &book,
            &params,
            started,
            self.telemetry.average_decode_latency(),
        ) {
            Ok(estimate) => self.emit(SimulatorEvent::Estimate(estimate)),
            Err(e) => warn!(error = %e, sequence = book.sequence(), "Skipping refresh"),
        }

        self.monitor.record_refresh(started.elapsed());
    }

    fn emit(&self, event: SimulatorEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Event buffer full, dropping event"),
            Err(TrySendError::Closed(_)) => debug!("Event receiver dropped"),
        }
    }
}

/// Run one tick, containing any panic so the cycle survives it.
/// Returns `false` if the tick panicked.
fn isolate_tick(tick: impl FnOnce()) -> bool {
    panic::catch_unwind(AssertUnwindSafe(tick)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradesim_core::OrderType;

    fn book() -> OrderBookSnapshot {
        OrderBookSnapshot::from_levels(&[(99.0, 1.0), (98.0, 2.0)], &[(100.0, 1.0), (101.0, 2.0)])
            .with_sequence(4)
    }

    #[test]
    fn test_net_cost() {
        let cost = net_cost(2.0, 100.0, 0.01, 0.5, 0.25);
        assert!((cost - (200.0 * 1.01 + 0.75)).abs() < 1e-12);
        assert_eq!(net_cost(0.0, 100.0, 0.02, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_compute_estimate() {
        let params = TradeParameters {
            symbol: "BTC-USDT".to_string(),
            quantity: 1.0,
            volatility: 0.02,
            ..Default::default()
        };
        let model = CostModel::default();
        let est = compute_estimate(
            &model,
            &book(),
            &params,
            Instant::now(),
            Duration::from_micros(42),
        )
        .unwrap();

        assert_eq!(est.mid_price, 99.5);
        assert_eq!(est.sequence, 4);
        assert_eq!(est.symbol, "BTC-USDT");
        assert_eq!(est.decode_latency_us, 42);
        assert!((est.slippage - 0.5 / 99.5).abs() < 1e-12);
        let expected = net_cost(1.0, 99.5, est.slippage, est.fees, est.market_impact);
        assert_eq!(est.net_cost, expected);
        assert!((0.0..=0.8).contains(&est.maker_proportion));
    }

    #[test]
    fn test_compute_estimate_rejects_unusable_book() {
        let model = CostModel::default();
        let params = TradeParameters::default();
        let crossed = OrderBookSnapshot::from_levels(&[(101.0, 1.0)], &[(100.0, 1.0)]);
        let empty = OrderBookSnapshot::from_levels(&[], &[]);

        for b in [crossed, empty] {
            assert!(matches!(
                compute_estimate(&model, &b, &params, Instant::now(), Duration::ZERO),
                Err(SimulatorError::InvalidBook(_))
            ));
        }
    }

    #[test]
    fn test_panicking_tick_is_contained() {
        let mut ran_after = false;
        assert!(!isolate_tick(|| panic!("bad tick")));
        assert!(isolate_tick(|| ran_after = true));
        assert!(ran_after);
    }

    #[test]
    fn test_event_serialization() {
        let event = SimulatorEvent::Status(ConnectionState::Connected);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"status","data":"connected"}"#);

        let params = TradeParameters {
            order_type: OrderType::Limit,
            quantity: 1.0,
            ..Default::default()
        };
        let model = CostModel::default();
        let est =
            compute_estimate(&model, &book(), &params, Instant::now(), Duration::ZERO).unwrap();
        let json = serde_json::to_value(SimulatorEvent::Estimate(est)).unwrap();
        assert_eq!(json["type"], "estimate");
        assert_eq!(json["data"]["slippage"], 0.0);
    }
}
