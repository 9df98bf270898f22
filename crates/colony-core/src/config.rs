//! Configuration loading and typed config structures for the colony engine.
//!
//! The canonical configuration lives in `colony-config.yaml` at the project
//! root. Every field has a default, so a missing section (or an empty file)
//! yields the stock colony behaviour.

use std::path::Path;

use colony_types::{ColonyId, Role};
use serde::Deserialize;

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

/// Top-level colony configuration.
///
/// Mirrors the structure of `colony-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColonyConfig {
    /// Colony identity.
    #[serde(default)]
    pub colony: ColonySection,

    /// Population thresholds.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Production queue seeding.
    #[serde(default)]
    pub production: ProductionConfig,

    /// Threat detection.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Hauler delivery cascade thresholds.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Upgrader search radii.
    #[serde(default)]
    pub upgrader: UpgraderConfig,

    /// Builder search radii.
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Persistence backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ColonyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the store:
    /// - `DRAGONFLY_URL` overrides `store.url`
    /// - `COLONY_STORE_DIR` overrides `store.path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.store.apply_env_overrides();
        Ok(config)
    }
}

/// Colony identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColonySection {
    /// The colony this engine serves. When set, snapshots for any other
    /// colony are skipped.
    #[serde(default)]
    pub id: Option<ColonyId>,

    /// Human-readable colony name, used in logs.
    #[serde(default = "default_colony_name")]
    pub name: String,
}

impl Default for ColonySection {
    fn default() -> Self {
        Self {
            id: None,
            name: default_colony_name(),
        }
    }
}

/// Population thresholds evaluated every tick.
///
/// A role is enqueued while its live count is at or below its limit
/// (builders: strictly below).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopulationConfig {
    /// Harvester limit while the early phase lasts.
    #[serde(default = "default_two")]
    pub harvester_limit: u32,

    /// Miner target.
    #[serde(default = "default_miner_target")]
    pub miner_target: u32,

    /// Hauler limit.
    #[serde(default = "default_two")]
    pub hauler_limit: u32,

    /// Upgrader limit.
    #[serde(default = "default_two")]
    pub upgrader_limit: u32,

    /// Builder limit (exclusive).
    #[serde(default = "default_two")]
    pub builder_limit: u32,

    /// Minimum colony tier before builders are produced.
    #[serde(default = "default_two")]
    pub builder_min_tier: u32,

    /// Miner count that ends the early phase.
    #[serde(default = "default_phase_miners")]
    pub phase_miners: u32,

    /// Hauler count that ends the early phase.
    #[serde(default = "default_two")]
    pub phase_haulers: u32,

    /// Upgrader count that ends the early phase.
    #[serde(default = "default_two")]
    pub phase_upgraders: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            harvester_limit: default_two(),
            miner_target: default_miner_target(),
            hauler_limit: default_two(),
            upgrader_limit: default_two(),
            builder_limit: default_two(),
            builder_min_tier: default_two(),
            phase_miners: default_phase_miners(),
            phase_haulers: default_two(),
            phase_upgraders: default_two(),
        }
    }
}

/// Production queue seeding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductionConfig {
    /// Roles queued when a colony is first bootstrapped.
    #[serde(default = "default_bootstrap_queue")]
    pub bootstrap_queue: Vec<Role>,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            bootstrap_queue: default_bootstrap_queue(),
        }
    }
}

/// Threat detection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SafetyConfig {
    /// Range within which a hostile makes a tile unsafe.
    #[serde(default = "default_danger_radius")]
    pub danger_radius: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            danger_radius: default_danger_radius(),
        }
    }
}

/// Hauler delivery cascade thresholds, as whole percentages of free
/// capacity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryConfig {
    /// Free-ratio threshold of the first structure pass.
    #[serde(default = "default_primary_free_percent")]
    pub primary_free_percent: u32,

    /// Free-ratio threshold of the relaxed structure pass.
    #[serde(default = "default_relaxed_free_percent")]
    pub relaxed_free_percent: u32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            primary_free_percent: default_primary_free_percent(),
            relaxed_free_percent: default_relaxed_free_percent(),
        }
    }
}

/// Upgrader search radii around the colony controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpgraderConfig {
    /// Radius scanned for storage or dropped resource.
    #[serde(default = "default_fetch_radius")]
    pub fetch_radius: u32,

    /// Radius the upgrader waits within when nothing is found.
    #[serde(default = "default_two")]
    pub wait_radius: u32,
}

impl Default for UpgraderConfig {
    fn default() -> Self {
        Self {
            fetch_radius: default_fetch_radius(),
            wait_radius: default_two(),
        }
    }
}

/// Builder search radii.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuilderConfig {
    /// Radius around a construction site in which containers are preferred.
    #[serde(default = "default_two")]
    pub site_container_radius: u32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            site_container_radius: default_two(),
        }
    }
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local memory; lost on exit.
    #[default]
    Memory,
    /// One JSON document per colony in a directory.
    File,
    /// Dragonfly (Redis protocol).
    Dragonfly,
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Backend kind.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory used by the file backend.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Connection URL used by the Dragonfly backend.
    #[serde(default = "default_dragonfly_url")]
    pub url: String,
}

impl StoreConfig {
    /// Override store locations with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.url = val;
        }
        if let Ok(val) = std::env::var("COLONY_STORE_DIR") {
            self.path = val;
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            url: default_dragonfly_url(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_colony_name() -> String {
    "colony".to_owned()
}

const fn default_two() -> u32 {
    2
}

const fn default_miner_target() -> u32 {
    4
}

const fn default_phase_miners() -> u32 {
    3
}

fn default_bootstrap_queue() -> Vec<Role> {
    vec![Role::Harvester, Role::Miner, Role::Hauler]
}

const fn default_danger_radius() -> u32 {
    colony_world::DEFAULT_DANGER_RADIUS
}

const fn default_primary_free_percent() -> u32 {
    30
}

const fn default_relaxed_free_percent() -> u32 {
    20
}

const fn default_fetch_radius() -> u32 {
    3
}

fn default_store_path() -> String {
    "colony-data".to_owned()
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ColonyConfig::default();
        assert_eq!(config.population.miner_target, 4);
        assert_eq!(config.population.harvester_limit, 2);
        assert_eq!(config.safety.danger_radius, 5);
        assert_eq!(config.delivery.primary_free_percent, 30);
        assert_eq!(config.delivery.relaxed_free_percent, 20);
        assert_eq!(config.upgrader.fetch_radius, 3);
        assert_eq!(config.upgrader.wait_radius, 2);
        assert_eq!(
            config.production.bootstrap_queue,
            vec![Role::Harvester, Role::Miner, Role::Hauler]
        );
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
colony:
  id: "01890a5d-ac96-774b-bcce-b302099a8057"
  name: "W1N1"

population:
  harvester_limit: 3
  miner_target: 6
  hauler_limit: 3
  upgrader_limit: 1
  builder_limit: 4
  builder_min_tier: 3

production:
  bootstrap_queue:
    - miner
    - hauler

safety:
  danger_radius: 7

delivery:
  primary_free_percent: 40
  relaxed_free_percent: 10

upgrader:
  fetch_radius: 4
  wait_radius: 1

builder:
  site_container_radius: 3

store:
  backend: file
  path: "/var/lib/colony"

logging:
  level: "debug"
  json: true
"#;

        let config = ColonyConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.colony.name, "W1N1");
        assert_eq!(
            config.colony.id.map(|id| id.to_string()).as_deref(),
            Some("01890a5d-ac96-774b-bcce-b302099a8057")
        );
        assert_eq!(config.population.miner_target, 6);
        assert_eq!(config.population.builder_min_tier, 3);
        assert_eq!(config.production.bootstrap_queue, vec![Role::Miner, Role::Hauler]);
        assert_eq!(config.safety.danger_radius, 7);
        assert_eq!(config.delivery.relaxed_free_percent, 10);
        assert_eq!(config.upgrader.wait_radius, 1);
        assert_eq!(config.builder.site_container_radius, 3);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "population:\n  miner_target: 2\n";
        let config = ColonyConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.population.miner_target, 2);
        // Everything else uses defaults
        assert_eq!(config.colony.id, None);
        assert_eq!(config.population.hauler_limit, 2);
        assert_eq!(config.safety.danger_radius, 5);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = ColonyConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn parse_rejects_unknown_role() {
        let yaml = "production:\n  bootstrap_queue: [warrior]\n";
        assert!(ColonyConfig::parse(yaml).is_err());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("colony-config.yaml");
        if path.exists() {
            let config = ColonyConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
