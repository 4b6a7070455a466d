//! Ingestion error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Payload ended before a value could be read
    #[error("truncated payload: need {needed} bytes at offset {offset}, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// Payload is not a point cloud message
    #[error("fingerprint mismatch: expected {expected:#018x}, found {found:#018x}")]
    FingerprintMismatch { expected: u64, found: u64 },

    /// Negative or out-of-range length prefix
    #[error("invalid length for {what}: {len}")]
    InvalidLength { what: &'static str, len: i64 },

    /// Unknown `PointFieldType` code
    #[error("field '{field}' has unknown datatype code {code}")]
    UnknownDatatype { field: String, code: i8 },

    /// String is not valid UTF-8
    #[error("invalid UTF-8 in {what}")]
    InvalidUtf8 { what: &'static str },

    /// Bytes left over after the last field
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// Required field absent from the field table
    #[error("point cloud has no '{0}' field")]
    MissingField(String),

    /// Field does not fit inside one point record
    #[error("field '{name}' ends at byte {end}, past point_step {point_step}")]
    FieldOverrun {
        name: String,
        end: usize,
        point_step: usize,
    },

    /// Data blob smaller than the header describes
    #[error("point data too short: header needs {expected} bytes, got {actual}")]
    ShortData { expected: usize, actual: usize },

    /// Recording could not be loaded
    #[error("replay error at {path}: {message}")]
    Replay { path: PathBuf, message: String },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    pub fn replay(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Replay {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors raised while decoding a single payload
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, Self::Replay { .. } | Self::Io(_))
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Replay { path, message } => {
                ContractError::source("replay", format!("{}: {message}", path.display()))
            }
            IngestionError::Io(e) => ContractError::Io(e),
            other => ContractError::payload_decode("", other.to_string()),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
