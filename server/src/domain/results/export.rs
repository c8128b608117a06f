//! Spreadsheet export

use thiserror::Error;

use super::table::{Cell, ResultTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV writer error: {0}")]
    Writer(String),
}

impl ResultTable {
    /// CSV bytes (UTF-8 with BOM) using display labels as headers
    ///
    /// Cells carry raw values so a spreadsheet reads numbers as numbers.
    pub fn export_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut buf = UTF8_BOM.to_vec();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            writer.write_record(self.columns.iter().map(|c| c.label.as_str()))?;
            for row in &self.rows {
                writer.write_record(row.iter().map(raw_value))?;
            }
            writer
                .flush()
                .map_err(|e| ExportError::Writer(e.to_string()))?;
        }
        Ok(buf)
    }
}

fn raw_value(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Integer(v) => v.to_string(),
        Cell::Number(v) => v.to_string(),
        Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        Cell::Missing => String::new(),
    }
}
