//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once at startup; `RUST_LOG` overrides the configured default directive.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Errors from subscriber installation.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log directive '{directive}': {message}")]
    InvalidDirective { directive: String, message: String },

    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Where and how verbosely to log.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub default_directive: String,
    /// Also write to `<dir>/<file_name>` when set.
    pub file: Option<(PathBuf, String)>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_LOG_DIRECTIVE.to_string(),
            file: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    pub fn with_file(mut self, dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        self.file = Some((dir.into(), file_name.into()));
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        let directive: Directive = self.default_directive.parse().map_err(|e: ParseError| {
            LoggingError::InvalidDirective {
                directive: self.default_directive.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(EnvFilter::builder()
            .with_default_directive(directive)
            .from_env_lossy())
    }
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when file output is enabled; dropping it
/// flushes and stops the background writer.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(config.ansi);

    match &config.file {
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map(|_| None)
            .map_err(|_| LoggingError::AlreadyInitialized),
        Some((dir, file_name)) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            builder
                .with_writer(std::io::stderr.and(file_writer))
                .try_init()
                .map(|_| Some(guard))
                .map_err(|_| LoggingError::AlreadyInitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.default_directive, "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_invalid_directive_rejected() {
        let config = LoggingConfig::default().with_directive("tilescope=loud");
        assert!(matches!(
            config.filter(),
            Err(LoggingError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn test_valid_directive_accepted() {
        let config = LoggingConfig::default().with_directive("tilescope=debug");
        assert!(config.filter().is_ok());
    }
}
