//! Authentication manager

use thiserror::Error;

use super::jwt::{JwtError, SessionClaims, create_session_token, validate_session_token};
use crate::core::config::AuthConfig;
use crate::utils::crypto;

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Invalid password")]
    InvalidPassword,

    #[error("Failed to issue session token: {0}")]
    Token(String),
}

/// Checks the dashboard password and issues session tokens
#[derive(Debug)]
pub struct AuthManager {
    signing_key: Vec<u8>,
    password: Option<String>,
    enabled: bool,
}

impl AuthManager {
    /// Sessions do not survive a restart: the signing key is generated per process
    pub fn new(config: &AuthConfig) -> Self {
        if config.enabled {
            tracing::debug!("Authentication enabled");
        } else {
            tracing::warn!("Authentication DISABLED");
        }

        Self {
            signing_key: crypto::generate_signing_key(),
            password: config.password.clone(),
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Exchange the dashboard password for a session token
    pub fn login(&self, password: &str) -> Result<(String, SessionClaims), LoginError> {
        if self.enabled {
            let expected = self.password.as_deref().unwrap_or_default();
            if expected.is_empty() || !crypto::constant_time_eq(expected, password) {
                return Err(LoginError::InvalidPassword);
            }
        }

        let claims = SessionClaims::new(if self.enabled { "password" } else { "disabled" });
        let token = create_session_token(&self.signing_key, &claims)
            .map_err(|e| LoginError::Token(e.to_string()))?;
        Ok((token, claims))
    }

    pub fn validate_session(&self, jwt: &str) -> Result<SessionClaims, JwtError> {
        validate_session_token(jwt, &self.signing_key)
    }
}
