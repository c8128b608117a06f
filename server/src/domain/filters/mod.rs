//! Filter-to-query compiler
//!
//! - `spec` - static filter catalog
//! - `value` / `state` - current filter values for one session
//! - `predicate` - placeholder-only SQL fragments
//! - `builder` - per-filter predicate construction
//! - `query` - assembly into one bounded statement

mod builder;
mod predicate;
mod query;
mod spec;
mod state;
mod value;

pub use builder::build_predicates;
pub use predicate::{BoundParam, ParamBinder, Predicate, SqlValue};
pub use query::{CompiledQuery, QueryAssembler, RESULT_COLUMNS, SearchPlan, TableName};
pub use spec::{CATALOG, FilterKind, FilterSpec, ScalarType, find};
pub use state::{FilterError, FilterInput, FilterState};
pub use value::{FilterValue, parse_tokens};
