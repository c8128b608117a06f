//! DuckDB error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuckdbError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Query timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("DuckDB connection is closed")]
    Closed,

    #[error("Unbound query parameter: @{0}")]
    UnboundParameter(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
