//! Per-user search sessions
//!
//! A session owns the filter values and the last result set. Sessions live
//! in a bounded in-memory store keyed by the auth session id and expire
//! after a period of inactivity.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;

use super::filters::FilterState;
use super::results::ResultTable;
use crate::core::constants::{SESSION_IDLE_SECS, SESSION_STORE_MAX_ENTRIES};

/// Where a stored result set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    Filters,
    Question,
}

/// Last processed result set of a session
#[derive(Debug, Clone)]
pub struct StoredResults {
    pub origin: ResultOrigin,
    pub table: ResultTable,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    pub filters: FilterState,
    results: Option<StoredResults>,
}

impl SearchSession {
    pub fn results(&self) -> Option<&StoredResults> {
        self.results.as_ref()
    }

    pub fn store_results(&mut self, origin: ResultOrigin, table: ResultTable) {
        self.results = Some(StoredResults {
            origin,
            table,
            stored_at: Utc::now(),
        });
    }

    pub fn clear_results(&mut self) {
        self.results = None;
    }

    /// Every filter back to inactive and no results held
    pub fn reset_all(&mut self) {
        self.filters.reset_all();
        self.results = None;
    }
}

pub type SharedSession = Arc<Mutex<SearchSession>>;

/// Bounded store of live sessions
///
/// Callers lock a session only for synchronous reads and writes; the lock is
/// never held while a query or oracle call is in flight.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, SharedSession>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_STORE_MAX_ENTRIES, Duration::from_secs(SESSION_IDLE_SECS))
    }
}

impl SessionStore {
    pub fn new(max_entries: u64, idle: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(max_entries)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// Existing session for `id`, or a fresh one
    pub fn get_or_create(&self, id: &str) -> SharedSession {
        self.sessions
            .get_with(id.to_string(), || Arc::new(Mutex::new(SearchSession::default())))
    }

    pub fn remove(&self, id: &str) {
        self.sessions.invalidate(id);
    }

    pub fn len(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
