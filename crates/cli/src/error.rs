//! Error types for CLI operations.

use contracts::ContractError;
use ingestion::IngestionError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Message source could not be opened
    #[error("Failed to open {kind} source: {source}")]
    Source {
        kind: &'static str,
        #[source]
        source: IngestionError,
    },

    /// Metrics exporter could not be started
    #[error("Failed to start metrics exporter on port {port}: {message}")]
    Metrics { port: u16, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn source(kind: &'static str, source: IngestionError) -> Self {
        Self::Source { kind, source }
    }

    pub fn metrics(port: u16, message: impl Into<String>) -> Self {
        Self::Metrics {
            port,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
