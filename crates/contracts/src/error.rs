//! Layered error definitions
//!
//! Categorized by source: config / payload / source / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Payload Errors =====
    /// Wire payload could not be decoded
    #[error("payload decode error on channel '{channel}': {message}")]
    PayloadDecode { channel: String, message: String },

    // ===== Source Errors =====
    /// Message source could not be opened
    #[error("source '{source_kind}' error: {message}")]
    Source {
        source_kind: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create payload decode error
    pub fn payload_decode(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PayloadDecode {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create source error
    pub fn source(source_kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_kind: source_kind.into(),
            message: message.into(),
        }
    }
}
