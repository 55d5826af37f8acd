//! Configuration loading and typed config structures for Vitalmap.
//!
//! The canonical configuration lives in `vitalmap-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure and a
//! loader that reads the file. Semantic checks (probabilities in range,
//! positive intervals, usable region table) happen when the simulator is
//! constructed, so a bad file fails before the first tick.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use vitalmap_types::{Category, Region};

/// Environment variable overriding `world.seed`.
pub const ENV_SEED: &str = "VITALMAP_SEED";

/// Environment variable overriding `observer.port`.
pub const ENV_OBSERVER_PORT: &str = "VITALMAP_OBSERVER_PORT";

/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "VITALMAP_LOG_LEVEL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// An environment override that was set but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ignoring invalid override {var}={value:?}: {reason}")]
pub struct RejectedOverride {
    /// Name of the environment variable.
    pub var: &'static str,
    /// The raw value as found.
    pub value: String,
    /// Why it did not parse.
    pub reason: String,
}

impl RejectedOverride {
    fn new(var: &'static str, value: String, reason: &impl std::fmt::Display) -> Self {
        Self {
            var,
            value,
            reason: reason.to_string(),
        }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `vitalmap-config.yaml`. Every section has
/// defaults matching the values the dashboard was tuned with.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Session-level settings (name, seed).
    #[serde(default)]
    pub world: WorldConfig,

    /// Event stream parameters.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Region table. Empty means the built-in provincial table.
    #[serde(default)]
    pub regions: Vec<Region>,

    /// Observer API server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Run boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are not applied here; call
    /// [`apply_env_overrides`](Self::apply_env_overrides) once logging is
    /// up so rejected values can be reported.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Override selected values from the process environment
    /// (`VITALMAP_SEED`, `VITALMAP_OBSERVER_PORT`, `VITALMAP_LOG_LEVEL`).
    ///
    /// Returns the overrides that were set but could not be parsed.
    pub fn apply_env_overrides(&mut self) -> Vec<RejectedOverride> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Override selected values using an arbitrary variable lookup.
    ///
    /// Values that fail to parse leave the config untouched and are
    /// returned to the caller.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<RejectedOverride> {
        let mut rejected = Vec::new();

        if let Some(raw) = lookup(ENV_SEED) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.world.seed = seed,
                Err(e) => rejected.push(RejectedOverride::new(ENV_SEED, raw, &e)),
            }
        }
        if let Some(raw) = lookup(ENV_OBSERVER_PORT) {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.observer.port = port,
                Err(e) => rejected.push(RejectedOverride::new(ENV_OBSERVER_PORT, raw, &e)),
            }
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL)
            && !level.trim().is_empty()
        {
            self.logging.level = level.trim().to_owned();
        }

        rejected
    }

    /// The configured regions, or the built-in table when none are given.
    pub fn regions_or_default(&self) -> Vec<Region> {
        if self.regions.is_empty() {
            crate::regions::default_regions()
        } else {
            self.regions.clone()
        }
    }
}

/// Session-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable session name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
        }
    }
}

/// Event stream parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Age in milliseconds after which an event leaves the live window.
    #[serde(default = "default_event_ttl_ms")]
    pub event_ttl_ms: u64,

    /// Run the expiry sweep every N ticks (1 = every tick).
    #[serde(default = "default_expiry_sweep_interval_ticks")]
    pub expiry_sweep_interval_ticks: u64,

    /// Maximum number of entries kept in each recent log.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Clock offset from UTC, in minutes, for the `HH:MM:SS` log prefix.
    #[serde(default = "default_log_utc_offset_minutes")]
    pub log_utc_offset_minutes: i32,

    /// Per-tick Bernoulli probability for each enabled category.
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<Category, f64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            event_ttl_ms: default_event_ttl_ms(),
            expiry_sweep_interval_ticks: default_expiry_sweep_interval_ticks(),
            log_capacity: default_log_capacity(),
            log_utc_offset_minutes: default_log_utc_offset_minutes(),
            categories: default_categories(),
        }
    }
}

/// Observer API server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether the observer server is started at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Host address to bind to.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format of log lines.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Run boundary configuration.
///
/// A value of 0 for either field means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the run ends (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Maximum wall-clock seconds before the run ends (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "China Life & Death".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    800
}

const fn default_event_ttl_ms() -> u64 {
    3_000
}

const fn default_expiry_sweep_interval_ticks() -> u64 {
    5
}

const fn default_log_capacity() -> usize {
    6
}

const fn default_log_utc_offset_minutes() -> i32 {
    480
}

fn default_categories() -> BTreeMap<Category, f64> {
    let mut m = BTreeMap::new();
    m.insert(Category::BirthMale, 0.3);
    m.insert(Category::BirthFemale, 0.3);
    m.insert(Category::Death, 0.5);
    m
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_dashboard_tuning() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.stream.tick_interval_ms, 800);
        assert_eq!(config.stream.event_ttl_ms, 3_000);
        assert_eq!(config.stream.expiry_sweep_interval_ticks, 5);
        assert_eq!(config.stream.log_capacity, 6);
        assert_eq!(config.stream.categories.len(), 3);
        assert!(config.regions.is_empty());
        assert_eq!(config.observer.port, 8080);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Session"
  seed: 123

stream:
  tick_interval_ms: 500
  event_ttl_ms: 2500
  expiry_sweep_interval_ticks: 1
  log_capacity: 8
  log_utc_offset_minutes: 0
  categories:
    BIRTH_MALE: 1.0
    DEATH: 0.25

regions:
  - id: north
    name: North
    local_name: "北"
    lat: 40.0
    lon: 116.0
    weight: 3
  - id: south
    name: South
    lat: 23.0
    lon: 113.0
    weight: 0.5

observer:
  enabled: false
  host: "127.0.0.1"
  port: 9090

logging:
  level: "debug"
  format: json

simulation:
  max_ticks: 100
  max_real_time_seconds: 60
"#;

        let config = SimulationConfig::parse(yaml).unwrap();

        assert_eq!(config.world.name, "Test Session");
        assert_eq!(config.world.seed, 123);
        assert_eq!(config.stream.tick_interval_ms, 500);
        assert_eq!(config.stream.log_capacity, 8);
        assert_eq!(config.stream.categories.len(), 2);
        assert_eq!(config.stream.categories.get(&Category::BirthMale), Some(&1.0));
        assert!(!config.stream.categories.contains_key(&Category::BirthFemale));
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.regions.get(1).unwrap().local_name, "");
        assert!(!config.observer.enabled);
        assert_eq!(config.observer.port, 9090);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.simulation.max_ticks, 100);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("world:\n  seed: 7\n").unwrap();

        // Seed is overridden
        assert_eq!(config.world.seed, 7);
        // Everything else uses defaults
        assert_eq!(config.stream.tick_interval_ms, 800);
        assert_eq!(config.stream.categories.len(), 3);
    }

    #[test]
    fn shipped_config_file_matches_defaults() {
        let yaml = include_str!("../../../vitalmap-config.yaml");
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn unknown_category_is_a_parse_error() {
        let yaml = "stream:\n  categories:\n    MARRIAGE: 0.5\n";
        assert!(SimulationConfig::parse(yaml).is_err());
    }

    #[test]
    fn overrides_from_lookup() {
        let mut config = SimulationConfig::default();
        let rejected = config.apply_overrides_from(|key| match key {
            ENV_SEED => Some("99".to_owned()),
            ENV_LOG_LEVEL => Some("debug".to_owned()),
            _ => None,
        });
        assert!(rejected.is_empty());
        assert_eq!(config.world.seed, 99);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn invalid_overrides_are_reported_and_ignored() {
        let mut config = SimulationConfig::default();
        let rejected = config.apply_overrides_from(|key| match key {
            ENV_SEED => Some("bogus".to_owned()),
            ENV_OBSERVER_PORT => Some("70000".to_owned()),
            _ => None,
        });

        assert_eq!(config.world.seed, 42);
        assert_eq!(config.observer.port, 8080);

        let vars: Vec<&str> = rejected.iter().map(|r| r.var).collect();
        assert_eq!(vars, vec![ENV_SEED, ENV_OBSERVER_PORT]);
        let first = rejected.first().unwrap();
        assert_eq!(first.value, "bogus");
        assert!(first.to_string().contains("VITALMAP_SEED"));
        assert!(first.to_string().contains("ignoring invalid override"));
    }

    #[test]
    fn from_file_does_not_read_environment() {
        let path = std::env::temp_dir().join(format!(
            "vitalmap-config-test-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "world:\n  seed: 5\n").unwrap();
        let config = SimulationConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.world.seed, 5);
    }

    #[test]
    fn built_in_regions_used_when_none_configured() {
        let config = SimulationConfig::default();
        assert_eq!(config.regions_or_default().len(), 31);
    }
}
