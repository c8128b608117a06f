//! Result post-processing: labels, numeric coercion, display, export

mod export;
mod format;
mod table;

pub use export::ExportError;
pub use format::{DisplayTable, Summary, format_number};
pub use table::{COLUMN_LABELS, Cell, Column, ResultTable, label_for, parse_number};
