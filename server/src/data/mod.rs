//! Data storage layer
//!
//! - `duckdb` - Declarations warehouse (search, option lists, import)
//! - `cache` - In-memory caching with rate limiting
//! - `traits` - Query engine trait the search service runs against
//! - `error` - Unified error type for the data layer

pub mod cache;
pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::{DuckdbService, FileAccess};
pub use error::DataError;
pub use traits::QueryEngine;
