//! QueryEngine implementation for DuckDB

use std::sync::Arc;

use async_trait::async_trait;
use duckdb::Connection;
use duckdb::types::Value;

use super::error::DuckdbError;
use super::params::rewrite_placeholders;
use super::sql_types::value_to_cell;
use super::DuckdbService;
use crate::data::error::DataError;
use crate::data::traits::QueryEngine;
use crate::domain::filters::BoundParam;
use crate::domain::results::ResultTable;

/// Run a read statement and collect every row as cells
pub(crate) fn fetch_table(
    conn: &Connection,
    sql: &str,
    params: &[BoundParam],
) -> Result<ResultTable, DuckdbError> {
    let (sql, values) = rewrite_placeholders(sql, params)?;
    let params_refs: Vec<&dyn duckdb::ToSql> =
        values.iter().map(|v| *v as &dyn duckdb::ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(&*params_refs)?;
    let columns = rows
        .as_ref()
        .map(|stmt| stmt.column_names())
        .unwrap_or_default();

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let cells = (0..columns.len())
            .map(|i| row.get::<_, Value>(i).map(value_to_cell))
            .collect::<Result<Vec<_>, _>>()?;
        out.push(cells);
    }
    Ok(ResultTable::new(columns, out))
}

#[async_trait]
impl QueryEngine for Arc<DuckdbService> {
    async fn execute(&self, sql: &str, params: &[BoundParam]) -> Result<ResultTable, DataError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.run_query(move |conn| fetch_table(conn, &sql, &params))
            .await
            .map_err(DataError::from)
    }

    fn backend_name(&self) -> &'static str {
        "duckdb"
    }
}
