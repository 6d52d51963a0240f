//! CLI error type.

use std::path::PathBuf;

use thiserror::Error;
use tilescope::config::ConfigError;
use tilescope::logging::LoggingError;

/// Errors surfaced to the user by the `tilescope` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Failed to read world fixture {path}: {source}")]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
