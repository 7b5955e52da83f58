//! Error types for the harness binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during harness startup and the final snapshot write.

use std::path::PathBuf;

/// Top-level error for the harness binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Warfare configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: colonia_warfare::ConfigError,
    },

    /// The harness configuration file could not be parsed.
    #[error("failed to parse {path}: {source}")]
    Yaml {
        /// File that failed to parse.
        path: PathBuf,
        /// The underlying YAML error.
        source: serde_yml::Error,
    },

    /// Colony seeding failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },

    /// Writing the final snapshot failed.
    #[error("snapshot error: {message}")]
    Snapshot {
        /// Description of the snapshot failure.
        message: String,
    },
}
