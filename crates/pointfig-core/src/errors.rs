//! Error taxonomy for the charting engine
//!
//! The column state machine itself never fails: every observation maps to
//! exactly one of accepted / ignored / reversal. Errors arise only at the
//! edges: parsing text into decimals and timestamps, loading snapshots,
//! validating configuration, and the ATR helper.

use thiserror::Error;

/// Engine errors surfaced to callers
#[derive(Error, Debug)]
pub enum ChartError {
    /// A string could not be parsed as an exact decimal
    #[error("cannot parse decimal value: '{value}'")]
    MalformedDecimal { value: String },

    /// A snapshot field held a value outside its enumeration or format
    #[error("invalid snapshot field '{field}': '{value}'")]
    MalformedSnapshot { field: String, value: String },

    /// A timestamp string did not match the configured format
    #[error("cannot parse timestamp '{value}' with format '{format}'")]
    MalformedTimestamp { value: String, format: String },

    /// Division by zero or arithmetic against an empty column's sentinel.
    /// Indicates a programming bug, not recoverable input.
    #[error("domain error: {message}")]
    DomainError { message: String },

    /// ATR called with too few OHLC rows
    #[error("not enough OHLC data: need more than {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// I/O failure while reading an observation stream
    #[error("observation stream I/O error")]
    Io(#[from] std::io::Error),

    /// Snapshot document could not be read or written as JSON
    #[error("snapshot JSON error")]
    SnapshotJson(#[from] serde_json::Error),
}

impl ChartError {
    pub(crate) fn domain(message: impl Into<String>) -> Self {
        ChartError::DomainError {
            message: message.into(),
        }
    }

    pub(crate) fn snapshot_field(field: &str, value: impl Into<String>) -> Self {
        ChartError::MalformedSnapshot {
            field: field.to_string(),
            value: value.into(),
        }
    }
}
