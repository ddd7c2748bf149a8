// src/error.rs
//! Error types for grid construction, access and table I/O.

use thiserror::Error;

/// Grid error type.
#[derive(Error, Debug)]
pub enum GridError {
    /// Index or coordinate resolves outside the addressable cells.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Derivative or spline operation on a grid built without that capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Axis metadata read back from a table disagrees with what the caller expects.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Requested dense capacity exceeds the configured ceiling (or overflows `usize`).
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Malformed construction or projection input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed grid table.
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GridError>;
