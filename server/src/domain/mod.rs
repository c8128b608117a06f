//! Domain logic for the declarations dashboard
//!
//! - `filters` - Filter catalog, values and parameterized query compilation
//! - `results` - Result post-processing, display formatting and export
//! - `oracle` - Natural-language search and code suggestions
//! - `session` - Per-user filter values and last results
//! - `search` - Orchestrates compile, execute and post-process

pub mod filters;
pub mod oracle;
pub mod results;
pub mod search;
pub mod session;

pub use search::{SearchOutcome, SearchService, SearchStatus};
pub use session::{SearchSession, SessionStore};
