//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` controls filtering (default
/// `info`); `TRADESIM_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TRADESIM_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
