//! Configuration loading
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file,
//! then `TRADESIM__`-prefixed environment variables
//! (e.g. `TRADESIM__FEED__BASE_URL`, `TRADESIM__TRADE__QUANTITY`).

use config::{Config, Environment, File};

use tradesim_core::{SimulatorConfig, SimulatorError, SimulatorResult};

const DEFAULT_CONFIG_FILE: &str = "tradesim";
const ENV_PREFIX: &str = "TRADESIM";

/// Load configuration. An explicit `path` must exist; the default
/// `tradesim.toml` is optional.
pub fn load_config(path: Option<&str>) -> SimulatorResult<SimulatorConfig> {
    let settings = Config::builder()
        .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(path.is_some()))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| SimulatorError::Config(e.to_string()))?;

    let config: SimulatorConfig = settings
        .try_deserialize()
        .map_err(|e| SimulatorError::Config(e.to_string()))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &SimulatorConfig) -> SimulatorResult<()> {
    if config.cycle_interval_ms == 0 {
        return Err(SimulatorError::Config("cycle_interval_ms must be > 0".into()));
    }
    if config.monitor_window == 0 {
        return Err(SimulatorError::Config("monitor_window must be > 0".into()));
    }
    if config.event_buffer == 0 {
        return Err(SimulatorError::Config("event_buffer must be > 0".into()));
    }
    if config.feed.base_url.is_empty() {
        return Err(SimulatorError::Config("feed.base_url must not be empty".into()));
    }
    Ok(())
}
