//! Simulator lifecycle against a scripted feed

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use tradesim_book_feed::{FeedConfig, FeedTelemetry, MarketFeed, SnapshotHandler};
use tradesim_core::{
    ConnectionState, CostEstimate, FeedResult, OrderBookSnapshot, OrderType, PerformanceMonitor,
    SimulationState, SimulatorConfig, SimulatorError, TradeParameters,
};
use tradesim_simulator::{FeedConnector, Simulator, SimulatorEvent};

/// Shared view of the most recent scripted connection
#[derive(Default)]
struct Script {
    handler: Option<Arc<dyn SnapshotHandler>>,
    telemetry: Option<FeedTelemetry>,
    urls: Vec<String>,
    sequence: u64,
}

#[derive(Clone, Default)]
struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    fn push(&self, bids: &[(f64, f64)], asks: &[(f64, f64)]) {
        let (handler, sequence) = {
            let mut script = self.script.lock();
            script.sequence += 1;
            (script.handler.clone().expect("feed not connected"), script.sequence)
        };
        let book = OrderBookSnapshot::from_levels(bids, asks).with_sequence(sequence);
        handler.on_snapshot(Arc::new(book));
    }

    fn set_state(&self, state: ConnectionState) {
        let telemetry = self.script.lock().telemetry.clone().expect("feed not connected");
        telemetry.set_state(state);
    }

    fn urls(&self) -> Vec<String> {
        self.script.lock().urls.clone()
    }
}

struct ScriptedFeed {
    url: String,
    telemetry: FeedTelemetry,
    running: bool,
}

#[async_trait]
impl MarketFeed for ScriptedFeed {
    fn start(&mut self) -> FeedResult<()> {
        self.running = true;
        self.telemetry.set_state(ConnectionState::Connected);
        Ok(())
    }

    async fn stop(&mut self) {
        self.running = false;
        self.telemetry.set_state(ConnectionState::Disconnected);
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn telemetry(&self) -> FeedTelemetry {
        self.telemetry.clone()
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

impl FeedConnector for ScriptedConnector {
    fn connect(
        &self,
        config: FeedConfig,
        handler: Arc<dyn SnapshotHandler>,
        _monitor: Arc<PerformanceMonitor>,
    ) -> Box<dyn MarketFeed> {
        let telemetry = FeedTelemetry::new(config.decode_window);
        let mut script = self.script.lock();
        script.handler = Some(handler);
        script.telemetry = Some(telemetry.clone());
        script.urls.push(config.url.clone());
        script.sequence = 0;

        Box::new(ScriptedFeed {
            url: config.url,
            telemetry,
            running: false,
        })
    }
}

fn config() -> SimulatorConfig {
    SimulatorConfig {
        cycle_interval_ms: 10,
        ..Default::default()
    }
}

fn params(quantity: f64) -> TradeParameters {
    TradeParameters {
        symbol: "BTC-USDT".to_string(),
        quantity,
        ..Default::default()
    }
}

fn simulator() -> (Simulator, ScriptedConnector, mpsc::Receiver<SimulatorEvent>) {
    let connector = ScriptedConnector::default();
    let mut sim = Simulator::with_connector(config(), Arc::new(connector.clone()));
    let rx = sim.take_event_receiver().unwrap();
    (sim, connector, rx)
}

async fn next_event(rx: &mut mpsc::Receiver<SimulatorEvent>) -> SimulatorEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn next_estimate(rx: &mut mpsc::Receiver<SimulatorEvent>) -> CostEstimate {
    loop {
        if let SimulatorEvent::Estimate(est) = next_event(rx).await {
            return est;
        }
    }
}

const BIDS: &[(f64, f64)] = &[(99.0, 1.0), (98.0, 2.0)];
const ASKS: &[(f64, f64)] = &[(100.0, 1.0), (101.0, 2.0)];

#[tokio::test]
async fn test_estimate_for_published_book() {
    let (mut sim, feed, mut rx) = simulator();
    sim.start_simulation(params(1.0)).unwrap();
    assert_eq!(sim.state(), SimulationState::Running);

    assert_eq!(next_event(&mut rx).await, SimulatorEvent::Status(ConnectionState::Connected));

    feed.push(BIDS, ASKS);
    let est = next_estimate(&mut rx).await;

    assert_eq!(est.mid_price, 99.5);
    assert_eq!(est.symbol, "BTC-USDT");
    assert_eq!(est.sequence, 1);
    assert!((est.slippage - 0.5 / 99.5).abs() < 1e-9);
    assert!(est.fees > 0.0);
    assert!(est.market_impact > 0.0);
    assert!((0.0..=0.8).contains(&est.maker_proportion));
    let expected = 99.5 * (1.0 + est.slippage) + est.fees + est.market_impact;
    assert!((est.net_cost - expected).abs() < 1e-9);

    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_quantity_beyond_depth_uses_fallback_slippage() {
    let (mut sim, feed, mut rx) = simulator();
    sim.start_simulation(params(5.0)).unwrap();

    feed.push(BIDS, ASKS);
    let est = next_estimate(&mut rx).await;
    assert_eq!(est.slippage, 0.02);

    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let (mut sim, _feed, _rx) = simulator();

    assert!(matches!(sim.stop_simulation().await, Err(SimulatorError::NotRunning)));
    assert!(matches!(sim.update_parameters(params(1.0)), Err(SimulatorError::NotRunning)));

    sim.start_simulation(params(1.0)).unwrap();
    assert!(matches!(sim.start_simulation(params(1.0)), Err(SimulatorError::AlreadyRunning)));

    sim.stop_simulation().await.unwrap();
    assert_eq!(sim.state(), SimulationState::Idle);
    assert!(sim.feed_stats().is_none());
}

#[tokio::test]
async fn test_stop_emits_terminal_disconnected_and_restart_works() {
    let (mut sim, feed, mut rx) = simulator();
    sim.start_simulation(params(1.0)).unwrap();
    feed.push(BIDS, ASKS);
    next_estimate(&mut rx).await;

    sim.stop_simulation().await.unwrap();

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(SimulatorEvent::Status(ConnectionState::Disconnected)));

    // No ticks after stop
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    sim.start_simulation(params(1.0)).unwrap();
    assert_eq!(next_event(&mut rx).await, SimulatorEvent::Status(ConnectionState::Connected));
    feed.push(BIDS, ASKS);
    let est = next_estimate(&mut rx).await;
    assert_eq!(est.sequence, 1);
    assert_eq!(feed.urls().len(), 2);

    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_unusable_book_skips_estimate_but_cycle_continues() {
    let (mut sim, feed, mut rx) = simulator();
    sim.start_simulation(params(1.0)).unwrap();

    // crossed
    feed.push(&[(101.0, 1.0)], &[(100.0, 1.0)]);
    tokio::time::sleep(Duration::from_millis(60)).await;
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, SimulatorEvent::Estimate(_)));
    }

    feed.push(BIDS, ASKS);
    let est = next_estimate(&mut rx).await;
    assert_eq!(est.sequence, 2);
    assert_eq!(est.mid_price, 99.5);

    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_parameter_update_applies_on_next_tick() {
    let (mut sim, feed, mut rx) = simulator();
    sim.start_simulation(params(1.0)).unwrap();
    feed.push(BIDS, ASKS);
    assert!(next_estimate(&mut rx).await.slippage > 0.0);

    sim.update_parameters(TradeParameters {
        order_type: OrderType::Limit,
        symbol: "ETH-USDT".to_string(),
        ..params(1.0)
    })
    .unwrap();

    // venue/symbol stay bound to the open feed
    let current = sim.parameters().unwrap();
    assert_eq!(current.order_type, OrderType::Limit);
    assert_eq!(current.symbol, "BTC-USDT");

    let est = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let est = next_estimate(&mut rx).await;
            if est.slippage == 0.0 {
                return est;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(est.mid_price, 99.5);

    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_status_changes_are_forwarded() {
    let (mut sim, feed, mut rx) = simulator();
    sim.start_simulation(params(1.0)).unwrap();
    assert_eq!(next_event(&mut rx).await, SimulatorEvent::Status(ConnectionState::Connected));

    feed.set_state(ConnectionState::Reconnecting);
    assert_eq!(next_event(&mut rx).await, SimulatorEvent::Status(ConnectionState::Reconnecting));

    feed.set_state(ConnectionState::Connected);
    assert_eq!(next_event(&mut rx).await, SimulatorEvent::Status(ConnectionState::Connected));

    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_endpoint_from_venue_and_symbol() {
    let (mut sim, feed, _rx) = simulator();
    sim.start_simulation(TradeParameters {
        venue: "OKX".to_string(),
        symbol: "ETH-USDT-SWAP".to_string(),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(
        feed.urls(),
        vec!["wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook/okx/ETH-USDT-SWAP".to_string()]
    );
    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_refresh_timings_recorded() {
    let (mut sim, feed, mut rx) = simulator();
    sim.start_simulation(params(1.0)).unwrap();
    feed.push(BIDS, ASKS);
    next_estimate(&mut rx).await;
    next_estimate(&mut rx).await;

    let perf = sim.performance();
    assert!(perf.refresh.count >= 2);
    assert!(perf.refresh.max >= perf.refresh.mean);
    assert!(sim.latest_snapshot().is_some());

    sim.stop_simulation().await.unwrap();
}

#[tokio::test]
async fn test_stop_returns_when_event_buffer_is_full() {
    let connector = ScriptedConnector::default();
    let config = SimulatorConfig {
        cycle_interval_ms: 1,
        event_buffer: 4,
        ..Default::default()
    };
    // receiver is never taken, so nothing drains the buffer
    let mut sim = Simulator::with_connector(config, Arc::new(connector.clone()));
    sim.start_simulation(params(1.0)).unwrap();
    connector.push(BIDS, ASKS);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopped = tokio::time::timeout(Duration::from_secs(3), sim.stop_simulation()).await;
    assert!(matches!(stopped, Ok(Ok(()))));
    assert_eq!(sim.state(), SimulationState::Idle);
}
