//! Query engine trait for the warehouse backend
//!
//! The search service only needs "run this statement with these bindings and
//! give me a table back"; the warehouse implements that here.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::domain::filters::BoundParam;
use crate::domain::results::ResultTable;

#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute a read statement with named `@param` bindings
    async fn execute(&self, sql: &str, params: &[BoundParam]) -> Result<ResultTable, DataError>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
