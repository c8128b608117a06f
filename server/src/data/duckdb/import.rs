//! Bulk load of declaration exports into the warehouse

use std::path::Path;

use duckdb::Connection;

use super::error::DuckdbError;
use super::in_transaction;
use super::schema::{DECLARATION_COLUMNS, row_count};
use crate::domain::filters::TableName;
use crate::utils::sql::quote_literal;

/// Source file reader, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Parquet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, DuckdbError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("tsv") => Ok(Self::Tsv),
            Some("parquet") => Ok(Self::Parquet),
            _ => Err(DuckdbError::Import(format!(
                "unsupported file type: {} (expected .csv, .tsv or .parquet)",
                path.display()
            ))),
        }
    }

    fn reader(self, path: &str) -> String {
        let path = quote_literal(path);
        match self {
            Self::Csv => format!("read_csv_auto({path}, header = true, all_varchar = true)"),
            Self::Tsv => format!(
                "read_csv_auto({path}, header = true, all_varchar = true, delim = '\\t')"
            ),
            Self::Parquet => format!("read_parquet({path})"),
        }
    }
}

/// Projection that normalizes source columns to the table types.
///
/// Text files are read as VARCHAR so customs codes keep leading zeros.
/// Numerics may arrive with spaces, non-breaking spaces (U+00A0, U+202F) as
/// thousands separators and commas as decimal marks, the same forms
/// `parse_number` accepts. Dates are ISO or `DD.MM.YYYY`. Unparseable values
/// become NULL.
fn select_list() -> String {
    DECLARATION_COLUMNS
        .iter()
        .map(|(name, ty)| {
            let text = format!("TRIM(CAST({name} AS VARCHAR))");
            match *ty {
                "DOUBLE" => format!(
                    "TRY_CAST(REPLACE(REPLACE(REPLACE(REPLACE({text}, ' ', ''), chr(160), ''), chr(8239), ''), ',', '.') AS DOUBLE)"
                ),
                "DATE" => format!(
                    "COALESCE(TRY_CAST({text} AS DATE), CAST(TRY_STRPTIME({text}, '%d.%m.%Y') AS DATE))"
                ),
                _ => format!("CAST({name} AS VARCHAR)"),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn insert_sql(table: &TableName, format: SourceFormat, path: &str) -> String {
    let columns = DECLARATION_COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({columns}) SELECT {} FROM {}",
        select_list(),
        format.reader(path)
    )
}

/// Load `path` into `table`, returning the number of rows inserted.
///
/// With `replace`, existing rows are removed in the same transaction.
pub fn import_file(
    conn: &Connection,
    table: &TableName,
    path: &Path,
    replace: bool,
) -> Result<u64, DuckdbError> {
    let format = SourceFormat::from_path(path)?;
    if !path.is_file() {
        return Err(DuckdbError::Import(format!(
            "file not found: {}",
            path.display()
        )));
    }
    let sql = insert_sql(table, format, &path.to_string_lossy());

    in_transaction(conn, |conn| {
        if replace {
            let before = row_count(conn, table)?;
            conn.execute_batch(&format!("DELETE FROM {table}"))?;
            tracing::debug!(table = %table, removed = before, "Cleared declarations table");
        }
        let inserted = conn.execute(&sql, [])?;
        Ok(inserted as u64)
    })
}
