//! WebSocket order book feed

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use tradesim_core::{
    ConnectionState, FeedError, FeedResult, FeedSettings, OrderBookSnapshot, PerformanceMonitor,
};

use crate::decode::decode_book;
use crate::state::FeedTelemetry;

/// Receives every successfully decoded snapshot.
///
/// Invocations for one connection are strictly ordered and never overlap:
/// the ingestion task calls the handler inline, one frame at a time.
pub trait SnapshotHandler: Send + Sync {
    fn on_snapshot(&self, snapshot: Arc<OrderBookSnapshot>);
}

impl<F> SnapshotHandler for F
where
    F: Fn(Arc<OrderBookSnapshot>) + Send + Sync,
{
    fn on_snapshot(&self, snapshot: Arc<OrderBookSnapshot>) {
        self(snapshot)
    }
}

/// Base trait for order book feeds
#[async_trait::async_trait]
pub trait MarketFeed: Send + Sync {
    /// Begin connecting in the background and return immediately
    fn start(&mut self) -> FeedResult<()>;
    /// Stop background activity; returns once the ingestion task is gone
    async fn stop(&mut self);
    fn is_running(&self) -> bool;
    fn telemetry(&self) -> FeedTelemetry;
    fn endpoint(&self) -> &str;
}

/// Feed configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub reconnect_delay: Duration,
    pub stop_timeout: Duration,
    pub decode_window: usize,
    pub subscribe_message: Option<String>,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        let defaults = FeedSettings::default();
        Self {
            url: url.into(),
            reconnect_delay: defaults.reconnect_delay(),
            stop_timeout: defaults.stop_timeout(),
            decode_window: defaults.decode_window,
            subscribe_message: None,
        }
    }

    /// Resolve the endpoint for `venue`/`symbol` from the configured template
    pub fn from_settings(settings: &FeedSettings, venue: &str, symbol: &str) -> Self {
        Self {
            url: settings.endpoint(venue, symbol),
            reconnect_delay: settings.reconnect_delay(),
            stop_timeout: settings.stop_timeout(),
            decode_window: settings.decode_window,
            subscribe_message: settings.subscribe_message.clone(),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

/// Live connection to one order book stream.
///
/// Transport loss moves the feed to `Reconnecting`, waits `reconnect_delay`
/// and tries again, forever, until `stop()` is called. A frame that fails to
/// decode is logged and skipped; it never closes the connection.
pub struct FeedConnection {
    config: FeedConfig,
    handler: Arc<dyn SnapshotHandler>,
    telemetry: FeedTelemetry,
    monitor: Option<Arc<PerformanceMonitor>>,
    stopping: Arc<AtomicBool>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FeedConnection {
    pub fn new(config: FeedConfig, handler: Arc<dyn SnapshotHandler>) -> Self {
        let telemetry = FeedTelemetry::new(config.decode_window);
        Self {
            config,
            handler,
            telemetry,
            monitor: None,
            stopping: Arc::new(AtomicBool::new(false)),
            shutdown: None,
            handle: None,
        }
    }

    /// Also report decode time and network latency to a process-wide monitor
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.telemetry.state()
    }

    pub fn average_processing_time(&self) -> Duration {
        self.telemetry.average_decode_latency()
    }
}

#[async_trait::async_trait]
impl MarketFeed for FeedConnection {
    fn start(&mut self) -> FeedResult<()> {
        if self.is_running() {
            return Err(FeedError::AlreadyRunning);
        }

        // A fresh flag per run; a previous run's worker is already joined
        self.stopping = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = FeedWorker {
            config: self.config.clone(),
            handler: Arc::clone(&self.handler),
            telemetry: self.telemetry.clone(),
            monitor: self.monitor.clone(),
            stopping: Arc::clone(&self.stopping),
            sequence: 0,
        };

        self.telemetry.set_state(ConnectionState::Connecting);
        self.handle = Some(tokio::spawn(worker.run(shutdown_rx)));
        self.shutdown = Some(shutdown_tx);

        info!(url = %self.config.url, "Feed started");
        Ok(())
    }

    async fn stop(&mut self) {
        self.stopping.store(true, Ordering::Release);

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(mut handle) = self.handle.take() {
            match tokio::time::timeout(self.config.stop_timeout, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Feed task ended abnormally"),
                Err(_) => {
                    warn!(
                        timeout = ?self.config.stop_timeout,
                        "Feed task did not stop in time, aborting"
                    );
                    handle.abort();
                    let _ = handle.await;
                }
            }
            info!(url = %self.config.url, "Feed stopped");
        }

        self.telemetry.set_state(ConnectionState::Disconnected);
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    fn telemetry(&self) -> FeedTelemetry {
        self.telemetry.clone()
    }

    fn endpoint(&self) -> &str {
        &self.config.url
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::Release);
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Background half of a `FeedConnection`
struct FeedWorker {
    config: FeedConfig,
    handler: Arc<dyn SnapshotHandler>,
    telemetry: FeedTelemetry,
    monitor: Option<Arc<PerformanceMonitor>>,
    stopping: Arc<AtomicBool>,
    sequence: u64,
}

impl FeedWorker {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut attempt: u64 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                res = self.connect_and_listen() => res,
            };

            match outcome {
                Ok(()) => warn!(url = %self.config.url, "Feed closed by server"),
                Err(e) => error!(url = %self.config.url, error = %e, "Feed connection error"),
            }

            attempt += 1;
            self.telemetry.record_reconnect();
            self.telemetry.set_state(ConnectionState::Reconnecting);
            warn!(
                url = %self.config.url,
                delay = ?self.config.reconnect_delay,
                attempt,
                "Reconnecting"
            );

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        self.telemetry.set_state(ConnectionState::Disconnected);
        debug!(url = %self.config.url, "Feed worker exited");
    }

    async fn connect_and_listen(&mut self) -> anyhow::Result<()> {
        info!(url = %self.config.url, "Connecting to order book feed");

        let (ws_stream, _) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        self.telemetry.set_state(ConnectionState::Connected);
        info!(url = %self.config.url, "Connected to order book feed");

        if let Some(subscribe) = &self.config.subscribe_message {
            write.send(Message::Text(subscribe.clone())).await?;
        }

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => self.handle_frame(&text),
                Ok(Message::Ping(data)) => {
                    write.send(Message::Pong(data)).await?;
                }
                Ok(Message::Close(frame)) => {
                    info!(?frame, "WebSocket closed by server");
                    return Ok(());
                }
                Ok(Message::Binary(data)) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(FeedError::Transport(e.to_string()).into());
                }
            }
        }

        Ok(())
    }

    fn handle_frame(&mut self, text: &str) {
        let started = Instant::now();

        let snapshot = match decode_book(text, self.sequence + 1) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.telemetry.record_decode_error();
                warn!(error = %e, "Skipping malformed frame");
                return;
            }
        };

        // stop() may have raced this frame in; it must not reach the handler
        if self.stopping.load(Ordering::Acquire) {
            debug!("Dropping frame received during shutdown");
            return;
        }

        self.sequence += 1;

        if let (Some(monitor), Some(sent_at)) = (&self.monitor, snapshot.exchange_time()) {
            let latency = (Utc::now() - sent_at).to_std().unwrap_or(Duration::ZERO);
            monitor.record_network_latency(latency);
        }

        self.handler.on_snapshot(Arc::new(snapshot));

        let elapsed = started.elapsed();
        self.telemetry.record_decode(elapsed);
        if let Some(monitor) = &self.monitor {
            monitor.record_processing(elapsed);
        }
    }
}
