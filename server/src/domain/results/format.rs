//! Display formatting and summaries
//!
//! Works on the raw processed table; formatted strings are never parsed back.

use serde::Serialize;
use utoipa::ToSchema;

use super::table::{Cell, ResultTable, VALUE_COLUMN, WEIGHT_COLUMN};

/// Formatted copy of a table, ready to render
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DisplayTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Summary {
    pub rows: usize,
    pub total_customs_value: f64,
    pub total_weight: f64,
}

impl ResultTable {
    pub fn display(&self) -> DisplayTable {
        DisplayTable {
            columns: self.columns.iter().map(|c| c.label.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(format_cell).collect())
                .collect(),
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            rows: self.len(),
            total_customs_value: self.column_total(VALUE_COLUMN),
            total_weight: self.column_total(WEIGHT_COLUMN),
        }
    }

    fn column_total(&self, key: &str) -> f64 {
        let Some(idx) = self.column_index(key) else {
            return 0.0;
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(Cell::as_f64))
            .sum()
    }
}

pub fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Integer(v) => v.to_string(),
        Cell::Number(v) => format_number(*v),
        Cell::Date(d) => d.format("%d.%m.%Y").to_string(),
        Cell::Missing => String::new(),
    }
}

/// `1234567.891` -> `1 234 567.89`
pub fn format_number(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(fixed.len() + digits.len() / 3 + 1);
    for (i, &b) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(b as char);
    }

    let sign = if v < 0.0 && fixed.bytes().any(|b| b != b'0' && b != b'.') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}
