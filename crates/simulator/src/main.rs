//! Trade cost simulator
//!
//! Main entry point: streams cost estimates as JSON lines on stdout
//!
//! Usage: `tradesim [config.toml]`

use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};

use tradesim_simulator::logging::init_tracing;
use tradesim_simulator::{load_config, Simulator, SimulatorEvent};

const PERFORMANCE_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    init_tracing()?;

    info!("Starting trade cost simulator v{}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args().nth(1);
    let config = load_config(path.as_deref())?;
    let params = config.trade.clone();

    let mut simulator = Simulator::new(config);
    let mut events = simulator
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("event receiver already taken"))?;

    simulator.start_simulation(params)?;

    // Presentation: one JSON object per event
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
            if event == SimulatorEvent::Status(tradesim_core::ConnectionState::Disconnected) {
                break;
            }
        }
    });

    let mut report = tokio::time::interval(PERFORMANCE_LOG_INTERVAL);
    report.tick().await;

    info!("Press Ctrl+C to shutdown");

    tokio::pin! {
        let shutdown = shutdown_signal();
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = report.tick() => {
                let perf = simulator.performance();
                let feed = simulator.feed_stats();
                info!(
                    processing_avg_us = perf.processing.mean.as_micros() as u64,
                    refresh_avg_us = perf.refresh.mean.as_micros() as u64,
                    network_avg_ms = perf.network.mean.as_millis() as u64,
                    messages = feed.as_ref().map(|s| s.messages).unwrap_or(0),
                    reconnects = feed.as_ref().map(|s| s.reconnects).unwrap_or(0),
                    "Performance"
                );
            }
        }
    }

    if let Err(e) = simulator.stop_simulation().await {
        error!("Stop failed: {}", e);
    }
    drop(simulator);

    if let Err(e) = printer.await {
        error!("Event printer failed: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        }
        _ = terminate => {
            info!("Received termination signal");
        }
    }
}
