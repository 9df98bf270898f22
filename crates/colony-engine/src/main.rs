//! Colony engine binary.
//!
//! Wires the decision engine to the outside world: world snapshots arrive
//! as JSON lines on stdin, tick outputs (the issued commands plus headline
//! counts) leave as JSON lines on stdout, and colony memory is persisted
//! in the configured store between ticks. Logs go to stderr so stdout
//! stays a clean command channel.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `COLONY_CONFIG` (default `colony-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the colony store
//! 4. Run the snapshot loop until end of input
//! 5. Log the result

mod error;
mod runner;

use std::path::Path;

use colony_core::ColonyConfig;
use colony_core::config::LoggingConfig;
use colony_db::AnyStore;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config path used when `COLONY_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "colony-config.yaml";

/// Application entry point for the colony engine.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the store cannot be
/// initialized, or if stdin/stdout fail.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        colony = %config.colony.name,
        store = ?config.store.backend,
        danger_radius = config.safety.danger_radius,
        "colony-engine starting"
    );

    // 3. Open the store.
    let store = AnyStore::open(&config.store).await?;
    info!(backend = store.backend(), "Colony store opened");

    // 4. Run the snapshot loop.
    let input = BufReader::new(tokio::io::stdin());
    let stats = runner::run(&store, &config, input, tokio::io::stdout()).await?;

    // 5. Log results.
    info!(
        lines = stats.lines,
        ticks = stats.ticks,
        skipped = stats.skipped,
        "colony-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `COLONY_CONFIG` or the default path.
///
/// A missing file yields defaults, with store environment overrides still
/// applied.
fn load_config() -> Result<ColonyConfig, EngineError> {
    let path = std::env::var("COLONY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config_path = Path::new(&path);
    if config_path.exists() {
        Ok(ColonyConfig::from_file(config_path)?)
    } else {
        let mut config = ColonyConfig::default();
        config.store.apply_env_overrides();
        Ok(config)
    }
}

/// Install the tracing subscriber, writing to stderr.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
