//! Conversions between DuckDB values and domain types

use chrono::{DateTime, NaiveDate};
use duckdb::ToSql;
use duckdb::types::{TimeUnit, ToSqlOutput, Value};

use crate::domain::filters::SqlValue;
use crate::domain::results::Cell;

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            SqlValue::Integer(v) => Value::BigInt(*v),
            SqlValue::Number(v) => Value::Double(*v),
            SqlValue::Text(v) => Value::Text(v.clone()),
        }))
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn to_micros(unit: TimeUnit, v: i64) -> i64 {
    match unit {
        TimeUnit::Second => v.saturating_mul(1_000_000),
        TimeUnit::Millisecond => v.saturating_mul(1_000),
        TimeUnit::Microsecond => v,
        TimeUnit::Nanosecond => v / 1_000,
    }
}

/// Map a DuckDB value onto a result cell
pub fn value_to_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Missing,
        Value::Boolean(b) => Cell::Text(b.to_string()),
        Value::TinyInt(v) => Cell::Integer(v.into()),
        Value::SmallInt(v) => Cell::Integer(v.into()),
        Value::Int(v) => Cell::Integer(v.into()),
        Value::BigInt(v) => Cell::Integer(v),
        Value::HugeInt(v) => i64::try_from(v).map_or(Cell::Number(v as f64), Cell::Integer),
        Value::UTinyInt(v) => Cell::Integer(v.into()),
        Value::USmallInt(v) => Cell::Integer(v.into()),
        Value::UInt(v) => Cell::Integer(v.into()),
        Value::UBigInt(v) => i64::try_from(v).map_or(Cell::Number(v as f64), Cell::Integer),
        Value::Float(v) => Cell::Number(v.into()),
        Value::Double(v) => Cell::Number(v),
        Value::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map_or(Cell::Missing, Cell::Number),
        Value::Text(s) => Cell::Text(s),
        Value::Enum(s) => Cell::Text(s),
        Value::Date32(days) => epoch()
            .checked_add_signed(chrono::Duration::days(days.into()))
            .map_or(Cell::Missing, Cell::Date),
        Value::Timestamp(unit, v) => match DateTime::from_timestamp_micros(to_micros(unit, v)) {
            Some(ts) => {
                let naive = ts.naive_utc();
                if naive.time() == chrono::NaiveTime::MIN {
                    Cell::Date(naive.date())
                } else {
                    Cell::Text(naive.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
            None => Cell::Missing,
        },
        other => Cell::Text(format!("{other:?}")),
    }
}

/// Map a result cell back to a bindable scalar (for option lists)
pub fn cell_to_sql_value(cell: Cell) -> Option<SqlValue> {
    match cell {
        Cell::Text(s) => Some(SqlValue::Text(s)),
        Cell::Integer(v) => Some(SqlValue::Integer(v)),
        Cell::Number(v) => Some(SqlValue::Number(v)),
        Cell::Date(d) => Some(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
        Cell::Missing => None,
    }
}
