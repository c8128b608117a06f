//! Password gate
//!
//! A single shared password unlocks the dashboard. A successful login gets a
//! signed session cookie; the token id doubles as the key of the visitor's
//! search session.

mod extractors;
pub mod jwt;
mod manager;
pub mod middleware;

pub use extractors::SessionId;
pub use jwt::SessionClaims;
pub use manager::{AuthManager, LoginError};
pub use middleware::{AuthError, AuthState, require_auth};
