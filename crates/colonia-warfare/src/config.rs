//! Typed configuration for the diplomacy and warfare engine.
//!
//! Every field has a default matching the engine's reference tuning, so an
//! empty YAML document (or [`WarfareConfig::default`]) yields a working
//! engine. The harness embeds this struct under its `warfare:` key.

use std::path::Path;

use serde::{Deserialize, Serialize};

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

/// Engine tuning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarfareConfig {
    /// RNG seed. `None` seeds from the operating system.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Per-border, per-tick roll that gates conflict ignition.
    #[serde(default = "default_border_conflict_chance")]
    pub border_conflict_chance: f64,

    /// Weight of size and proximity pressure in the ignition decision.
    #[serde(default = "default_resource_competition_factor")]
    pub resource_competition_factor: f64,

    /// Ignition is skipped entirely while this many conflicts are active.
    #[serde(default = "default_max_active_conflicts")]
    pub max_active_conflicts: usize,

    /// Two territory cells closer than this share a border point.
    #[serde(default = "default_adjacency_distance")]
    pub adjacency_distance: f64,

    /// Ticks between executions of one trade agreement.
    #[serde(default = "default_trade_execution_interval_ticks")]
    pub trade_execution_interval_ticks: u64,

    /// Ticks between automatic trade negotiation passes.
    #[serde(default = "default_auto_trade_interval_ticks")]
    pub auto_trade_interval_ticks: u64,

    /// Consecutive failed executions that deactivate an agreement.
    #[serde(default = "default_max_trade_failures")]
    pub max_trade_failures: u32,

    /// Ticks between automatic alliance formation passes.
    #[serde(default = "default_alliance_formation_interval_ticks")]
    pub alliance_formation_interval_ticks: u64,

    /// Ticks between joint operation passes.
    #[serde(default = "default_joint_operation_interval_ticks")]
    pub joint_operation_interval_ticks: u64,

    /// Ticks between peace negotiation passes.
    #[serde(default = "default_diplomacy_interval_ticks")]
    pub diplomacy_interval_ticks: u64,

    /// Base chance an idle Enemy pair signs a truce, scaled by `1 + trust`.
    #[serde(default = "default_peace_chance")]
    pub peace_chance: f64,

    /// Chance a trusting Truce pair relaxes back to Neutral.
    #[serde(default = "default_normalization_chance")]
    pub normalization_chance: f64,

    /// Maximum fortifications along one border.
    #[serde(default = "default_max_fortifications")]
    pub max_fortifications: u32,

    /// Ignition probability multiplier applied once per fortification.
    #[serde(default = "default_fortification_ignition_factor")]
    pub fortification_ignition_factor: f64,
}

impl Default for WarfareConfig {
    fn default() -> Self {
        Self {
            seed: None,
            border_conflict_chance: default_border_conflict_chance(),
            resource_competition_factor: default_resource_competition_factor(),
            max_active_conflicts: default_max_active_conflicts(),
            adjacency_distance: default_adjacency_distance(),
            trade_execution_interval_ticks: default_trade_execution_interval_ticks(),
            auto_trade_interval_ticks: default_auto_trade_interval_ticks(),
            max_trade_failures: default_max_trade_failures(),
            alliance_formation_interval_ticks: default_alliance_formation_interval_ticks(),
            joint_operation_interval_ticks: default_joint_operation_interval_ticks(),
            diplomacy_interval_ticks: default_diplomacy_interval_ticks(),
            peace_chance: default_peace_chance(),
            normalization_chance: default_normalization_chance(),
            max_fortifications: default_max_fortifications(),
            fortification_ignition_factor: default_fortification_ignition_factor(),
        }
    }
}

impl WarfareConfig {
    /// Load configuration from a YAML file at the given path.
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
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Return a copy with a fixed RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_border_conflict_chance() -> f64 {
    0.01
}

const fn default_resource_competition_factor() -> f64 {
    1.0
}

const fn default_max_active_conflicts() -> usize {
    10
}

const fn default_adjacency_distance() -> f64 {
    3.0
}

const fn default_trade_execution_interval_ticks() -> u64 {
    10
}

const fn default_auto_trade_interval_ticks() -> u64 {
    100
}

const fn default_max_trade_failures() -> u32 {
    3
}

const fn default_alliance_formation_interval_ticks() -> u64 {
    300
}

const fn default_joint_operation_interval_ticks() -> u64 {
    200
}

const fn default_diplomacy_interval_ticks() -> u64 {
    50
}

const fn default_peace_chance() -> f64 {
    0.1
}

const fn default_normalization_chance() -> f64 {
    0.1
}

const fn default_max_fortifications() -> u32 {
    5
}

const fn default_fortification_ignition_factor() -> f64 {
    0.9
}
