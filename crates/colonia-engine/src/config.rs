//! Harness configuration, loaded from `colonia-config.yaml`.
//!
//! The file has three sections: `run` (tick count and reporting),
//! `colonies` (the spawner) and `warfare` (the engine itself). Every key is
//! optional.

use std::path::{Path, PathBuf};

use colonia_warfare::{ConfigError, WarfareConfig};
use serde::Deserialize;

use crate::error::EngineError;
use crate::spawner::SpawnerConfig;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "COLONIA_CONFIG";

/// Config file looked up in the working directory when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "colonia-config.yaml";

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Tick loop settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Synthetic colony seeding and upkeep.
    #[serde(default)]
    pub colonies: SpawnerConfig,
    /// Diplomacy and warfare tuning.
    #[serde(default)]
    pub warfare: WarfareConfig,
}

/// Tick loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of ticks to simulate.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Ticks between statistics reports.
    #[serde(default = "default_report_interval_ticks")]
    pub report_interval_ticks: u64,

    /// Where to write the final JSON snapshot, if anywhere.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            report_interval_ticks: default_report_interval_ticks(),
            snapshot_path: None,
        }
    }
}

const fn default_ticks() -> u64 {
    2000
}

const fn default_report_interval_ticks() -> u64 {
    100
}

impl EngineConfig {
    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str, path: &Path) -> Result<Self, EngineError> {
        serde_yml::from_str(yaml).map_err(|source| EngineError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::parse(&contents, path)
    }
}

/// Resolve the config path: [`CONFIG_ENV`] if set, otherwise
/// [`DEFAULT_CONFIG_PATH`].
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the configuration at `path`, falling back to defaults when the
/// file does not exist.
pub fn load(path: &Path) -> Result<EngineConfig, EngineError> {
    if path.exists() {
        EngineConfig::from_file(path)
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}
