//! Unified error type for data layer
//!
//! Wraps warehouse errors while preserving which backend produced them.

use thiserror::Error;

use super::duckdb::DuckdbError;

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// DuckDB database error (warehouse backend)
    #[error("DuckDB error: {0}")]
    Duckdb(#[from] duckdb::Error),

    /// Statement could not be prepared for execution
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Bulk import failed
    #[error("Import failed: {0}")]
    Import(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Query timeout
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_secs: u64,
    },

    /// Backend not available
    #[error("Backend {backend} is not available: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },
}

impl DataError {
    /// Create a timeout error
    pub fn timeout(backend: &'static str, timeout_secs: u64) -> Self {
        Self::Timeout {
            backend,
            timeout_secs,
        }
    }

    /// Create a backend unavailable error
    pub fn backend_unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::BackendUnavailable { .. })
    }
}

impl From<DuckdbError> for DataError {
    fn from(e: DuckdbError) -> Self {
        match e {
            DuckdbError::Database(e) => Self::Duckdb(e),
            DuckdbError::Timeout { timeout_secs } => Self::timeout("duckdb", timeout_secs),
            DuckdbError::Closed => Self::backend_unavailable("duckdb", "connection closed"),
            DuckdbError::UnboundParameter(name) => {
                Self::InvalidQuery(format!("unbound parameter @{name}"))
            }
            DuckdbError::Import(msg) => Self::Import(msg),
            DuckdbError::Io(e) => Self::Io(e),
        }
    }
}
