//! Error types for the taxonomy repair engine.
//!
//! Audit failures are all-or-nothing (`IntegrityRead`, `Configuration`).
//! Repair failures are local to one operation (`NotFound`, `Write`,
//! `PreconditionFailed`) and never invalidate a previously produced report.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the taxonomy repair engine.
#[derive(Debug, Error)]
pub enum RepairError {
    // Audit errors
    #[error("Failed to read {table} snapshot: {message}")]
    IntegrityRead { table: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Repair errors
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Write rejected during {operation}: {message}")]
    Write {
        operation: &'static str,
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Precondition failed: {message}")]
    PreconditionFailed { message: String },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Result type alias for repair engine operations.
pub type Result<T> = std::result::Result<T, RepairError>;

impl From<std::io::Error> for RepairError {
    fn from(err: std::io::Error) -> Self {
        RepairError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RepairError {
    fn from(err: serde_json::Error) -> Self {
        RepairError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for RepairError {
    fn from(err: rusqlite::Error) -> Self {
        RepairError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl RepairError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        RepairError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Wrap a rusqlite failure raised by a mutating statement.
    pub fn write(operation: &'static str, err: rusqlite::Error) -> Self {
        RepairError::Write {
            operation,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Re-label any store failure as an unreadable table snapshot.
    pub fn integrity_read(table: impl Into<String>, err: RepairError) -> Self {
        match err {
            already @ RepairError::IntegrityRead { .. } => already,
            other => RepairError::IntegrityRead {
                table: table.into(),
                message: other.to_string(),
            },
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Snapshot could not be read
    /// - -32001: Registered taxonomies unavailable
    /// - -32002: Repair target not found
    /// - -32003: Store rejected the write
    /// - -32004: Repair precondition no longer holds
    /// - -32601: Unknown command
    /// - -32602: Invalid params
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            RepairError::IntegrityRead { .. } => -32000,
            RepairError::Configuration { .. } => -32001,
            RepairError::NotFound { .. } => -32002,
            RepairError::Write { .. } => -32003,
            RepairError::PreconditionFailed { .. } => -32004,
            RepairError::UnknownCommand(_) => -32601,
            RepairError::InvalidParams { .. } | RepairError::Validation { .. } => -32602,
            _ => -32603,
        }
    }

    /// A missing repair target means there is nothing left to do.
    pub fn is_benign(&self) -> bool {
        matches!(self, RepairError::NotFound { .. })
    }

    /// Check if the failed operation can simply be run again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepairError::Write { .. })
    }
}
