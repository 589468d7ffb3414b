use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Canonical error type for sweep, aggregation and comparison operations.
///
/// External tool failures are not represented here: they are recovered
/// locally by the runner and aggregator and reported through their outcomes.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The CLI target was neither a suite name, a suite alias nor a config file.
    #[error("unknown target `{0}`")]
    UnknownTarget(String),

    /// A required input file or directory does not exist.
    #[error("{kind} `{}` was not found", path.display())]
    NotFound {
        /// What was expected at the path (e.g. `"results directory"`).
        kind: &'static str,
        /// Path that was checked.
        path: PathBuf,
    },

    /// The external tool binary could not be started at all.
    #[error("failed to spawn `{binary}`: {source}")]
    Spawn {
        /// Binary that was invoked.
        binary: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Input was well-formed but semantically unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error while reading or writing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error while appending to the run log.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error while reading or writing metrics documents.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A comparison chart could not be rendered.
    #[error("plot error: {0}")]
    Plot(String),
}

impl SweepError {
    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            kind,
            path: path.into(),
        }
    }

    /// Creates an `InvalidInput` variant.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Convenient result alias for sweep operations.
pub type SweepResult<T> = Result<T, SweepError>;
