//! Declarations table definition

use duckdb::Connection;

use super::error::DuckdbError;
use crate::domain::filters::TableName;

/// Column definitions, in result order
pub const DECLARATION_COLUMNS: &[(&str, &str)] = &[
    ("napryamok", "VARCHAR"),
    ("data_deklaracii", "DATE"),
    ("kraina_partner", "VARCHAR"),
    ("kod_uktzed", "VARCHAR"),
    ("opis_tovaru", "VARCHAR"),
    ("nazva_kompanii", "VARCHAR"),
    ("kod_edrpou", "VARCHAR"),
    ("torgova_marka", "VARCHAR"),
    ("mytnytsia", "VARCHAR"),
    ("mytna_vartist_hrn", "DOUBLE"),
    ("vaha_netto_kg", "DOUBLE"),
];

pub fn create_table_sql(table: &TableName) -> String {
    let columns = DECLARATION_COLUMNS
        .iter()
        .map(|(name, ty)| format!("    {name} {ty}"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {table} (\n{columns}\n)")
}

/// Create the schema (if qualified) and the declarations table when missing
pub fn ensure_schema(conn: &Connection, table: &TableName) -> Result<(), DuckdbError> {
    if let Some((schema, _)) = table.as_str().split_once('.') {
        conn.execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))?;
    }
    conn.execute_batch(&create_table_sql(table))?;
    tracing::debug!(table = %table, "Declarations table ready");
    Ok(())
}

pub fn row_count(conn: &Connection, table: &TableName) -> Result<u64, DuckdbError> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as u64)
}
