//! Error types for bulkmt.
//!
//! Data-shape problems (unmatched delimiters, dead subscribers) are absorbed by
//! the assembler and the registry and never show up here. What remains is
//! startup configuration and sink-local I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors, raised before any input is read.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Bulk size '{value}' is not a number")]
    MalformedBulkSize {
        value: String,
    },

    #[error("Bulk size must be at least 1, got {value}")]
    BulkSizeOutOfRange {
        value: i64,
    },

    #[error("Output directory {} is not a directory", .path.display())]
    NotADirectory {
        path: PathBuf,
    },
}

/// Errors local to a single sink.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink '{sink}' is stopped")]
    Stopped {
        sink: String,
    },

    #[error("Failed to write to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to console: {0}")]
    Console(#[source] std::io::Error),

    #[error("Failed to spawn worker '{worker}': {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type for bulkmt.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),
}

impl BulkError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a sink error.
    #[must_use]
    pub const fn is_sink(&self) -> bool {
        matches!(self, Self::Sink(_))
    }

    /// Returns true if this is an input I/O error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Result type alias for bulkmt operations.
pub type BulkResult<T> = Result<T, BulkError>;
