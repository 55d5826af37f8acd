//! Engine binary for the Vitalmap simulator.
//!
//! Wires configuration, logging, the event-stream simulator, run control
//! and the Observer API together, then runs the driver loop until a
//! bound is reached or an operator stops it.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`VITALMAP_CONFIG` or `vitalmap-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulator from the stream config and region table
//! 4. Create run control from the simulation bounds
//! 5. Start the Observer API server
//! 6. Install the Ctrl-C handler
//! 7. Run the driver loop
//! 8. Log the result; keep serving the final snapshot until stopped

mod error;
mod observer_callback;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vitalmap_core::clock::SystemTimeSource;
use vitalmap_core::config::{LogFormat, LoggingConfig, RejectedOverride, SimulationConfig};
use vitalmap_core::control::{RunControl, SimulationEndReason};
use vitalmap_core::runner;
use vitalmap_core::simulator::EventStreamSimulator;
use vitalmap_observer::server::ServerConfig;
use vitalmap_observer::state::AppState;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Environment variable naming the config file.
const ENV_CONFIG_PATH: &str = "VITALMAP_CONFIG";

/// Config file used when `VITALMAP_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "vitalmap-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the run itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_path, rejected_overrides) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("vitalmap-engine starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Config file loaded"),
        None => info!("Config file not found, using defaults"),
    }
    for rejected in &rejected_overrides {
        warn!(
            var = rejected.var,
            value = %rejected.value,
            error = %rejected.reason,
            "ignoring invalid override"
        );
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.stream.tick_interval_ms,
        event_ttl_ms = config.stream.event_ttl_ms,
        "Configuration loaded"
    );

    // 3. Build the simulator.
    let mut simulator = EventStreamSimulator::from_config(&config).map_err(EngineError::from)?;

    // 4. Create run control.
    let control = Arc::new(RunControl::new(&config.simulation));

    // 5. Start Observer API server.
    let app_state = Arc::new(AppState::with_control(
        simulator.regions().as_slice().to_vec(),
        Arc::clone(&control),
    ));
    let observer_handle = if config.observer.enabled {
        let server_config = ServerConfig {
            host: config.observer.host.clone(),
            port: config.observer.port,
        };
        let handle = vitalmap_observer::spawn_observer(&server_config, Arc::clone(&app_state))
            .await
            .map_err(EngineError::from)?;
        Some(handle)
    } else {
        info!("Observer disabled by configuration");
        None
    };

    // 6. Ctrl-C requests a clean stop.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    // 7. Run the driver loop.
    let mut callback = ObserverCallback::new(app_state);
    let result = runner::run_simulation(
        &mut simulator,
        &control,
        &SystemTimeSource,
        &mut callback,
    )
    .await
    .map_err(EngineError::from)?;

    // 8. Log results.
    runner::log_simulation_end(&result);

    if let Some(handle) = observer_handle {
        if result.end_reason != SimulationEndReason::OperatorStop {
            info!("Observer still serving the final snapshot, press Ctrl-C to exit");
            control.stopped().await;
        }
        handle.abort();
    }

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "vitalmap-engine shutdown complete"
    );

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies,
/// falling back to `info` if it does not parse.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match logging.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Configuration, the file it came from, and any rejected env overrides.
type LoadedConfig = (SimulationConfig, Option<PathBuf>, Vec<RejectedOverride>);

/// Load the configuration from `VITALMAP_CONFIG` or `vitalmap-config.yaml`
/// and apply environment overrides.
///
/// A missing file is not an error: defaults are used. Rejected overrides
/// are returned rather than logged, since logging is not up yet.
fn load_config() -> Result<LoadedConfig, EngineError> {
    let config_path = std::env::var_os(ENV_CONFIG_PATH)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    let (mut config, source) = if config_path.exists() {
        (SimulationConfig::from_file(&config_path)?, Some(config_path))
    } else {
        (SimulationConfig::default(), None)
    };
    let rejected = config.apply_env_overrides();

    Ok((config, source, rejected))
}
