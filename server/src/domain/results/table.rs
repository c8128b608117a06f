//! Result tables and post-processing

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// Machine column to display label
pub const COLUMN_LABELS: &[(&str, &str)] = &[
    ("napryamok", "Напрямок"),
    ("data_deklaracii", "Дата декларації"),
    ("kraina_partner", "Країна-партнер"),
    ("kod_uktzed", "Код УКТЗЕД"),
    ("opis_tovaru", "Опис товару"),
    ("nazva_kompanii", "Назва компанії"),
    ("kod_edrpou", "Код ЄДРПОУ"),
    ("torgova_marka", "Торгова марка"),
    ("mytnytsia", "Митниця"),
    ("mytna_vartist_hrn", "Митна вартість, грн"),
    ("vaha_netto_kg", "Вага нетто, кг"),
];

pub const VALUE_COLUMN: &str = "mytna_vartist_hrn";
pub const WEIGHT_COLUMN: &str = "vaha_netto_kg";

/// Columns coerced to numbers
pub const NUMERIC_COLUMNS: &[&str] = &[VALUE_COLUMN, WEIGHT_COLUMN];

pub fn label_for(column: &str) -> Option<&'static str> {
    COLUMN_LABELS
        .iter()
        .find(|(key, _)| *key == column)
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(v) => Some(*v as f64),
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Column {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ResultTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    /// Table as returned by the engine; labels equal column names
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let columns = columns
            .into_iter()
            .map(|key| Column {
                label: key.clone(),
                key,
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    /// Apply display labels and coerce the numeric columns
    ///
    /// Unparsable numeric cells become [`Cell::Missing`]; the row is kept.
    pub fn post_process(mut self) -> Self {
        for column in &mut self.columns {
            if let Some(label) = label_for(&column.key) {
                column.label = label.to_string();
            }
        }

        let numeric: Vec<usize> = NUMERIC_COLUMNS
            .iter()
            .filter_map(|key| self.column_index(key))
            .collect();

        let mut coerced = 0usize;
        for row in &mut self.rows {
            for &idx in &numeric {
                if let Some(cell) = row.get_mut(idx) {
                    let next = coerce_numeric(cell);
                    if next == Cell::Missing && *cell != Cell::Missing {
                        coerced += 1;
                    }
                    *cell = next;
                }
            }
        }
        if coerced > 0 {
            tracing::debug!(cells = coerced, "Unparsable numeric cells marked missing");
        }
        self
    }
}

fn coerce_numeric(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(v) if v.is_finite() => Cell::Number(*v),
        Cell::Integer(v) => Cell::Number(*v as f64),
        Cell::Text(s) => parse_number(s).map_or(Cell::Missing, Cell::Number),
        _ => Cell::Missing,
    }
}

/// Parse numbers like `1 234,50` (spaces, non-breaking spaces, decimal comma)
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: Cell, weight: Cell) -> ResultTable {
        ResultTable::new(
            vec![
                "kod_uktzed".into(),
                "mytna_vartist_hrn".into(),
                "vaha_netto_kg".into(),
                "extra".into(),
            ],
            vec![vec![Cell::Text("8471300000".into()), value, weight, Cell::Missing]],
        )
    }

    #[test]
    fn test_labels_applied() {
        let t = raw(Cell::Missing, Cell::Missing).post_process();
        let labels: Vec<&str> = t.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Код УКТЗЕД", "Митна вартість, грн", "Вага нетто, кг", "extra"]
        );
        assert_eq!(t.columns[0].key, "kod_uktzed");
    }

    #[test]
    fn test_numeric_coercion() {
        let t = raw(Cell::Text("1 234,50".into()), Cell::Integer(12)).post_process();
        assert_eq!(t.rows[0][1], Cell::Number(1234.5));
        assert_eq!(t.rows[0][2], Cell::Number(12.0));
    }

    #[test]
    fn test_unparsable_becomes_missing_row_kept() {
        let t = raw(Cell::Text("н/д".into()), Cell::Text("".into())).post_process();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0][1], Cell::Missing);
        assert_eq!(t.rows[0][2], Cell::Missing);
        assert_eq!(t.rows[0][0], Cell::Text("8471300000".into()));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("\u{a0}12\u{a0}000,75 "), Some(12000.75));
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("-3,5"), Some(-3.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }
}
