//! API route handlers

pub mod auth;
pub mod filters;
pub mod health;
pub mod oracle;
pub mod search;

use std::sync::Arc;

use crate::api::auth::SessionId;
use crate::domain::session::SharedSession;
use crate::domain::{SearchService, SessionStore};

/// Shared state for the dashboard endpoints
#[derive(Clone)]
pub struct DashboardState {
    pub search: Arc<SearchService>,
    pub sessions: SessionStore,
}

impl DashboardState {
    pub fn new(search: Arc<SearchService>, sessions: SessionStore) -> Self {
        Self { search, sessions }
    }

    /// Session of the caller, created on first use
    pub fn session(&self, id: &SessionId) -> SharedSession {
        self.sessions.get_or_create(&id.0)
    }
}
