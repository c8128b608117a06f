//! JWT session token handling

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::constants::DEFAULT_SESSION_TTL_HOURS;

/// Subject of every dashboard token; there are no user accounts
const DASHBOARD_SUBJECT: &str = "dashboard";

/// JWT validation error
#[derive(Debug)]
pub enum JwtError {
    /// Token signature has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Other validation error
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Session token has expired"),
            Self::InvalidSignature => write!(f, "Invalid session token signature"),
            Self::Invalid(msg) => write!(f, "Invalid session token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Keys the server-side search session
    pub jti: String,
    pub auth_method: String,
}

impl SessionClaims {
    pub fn new(auth_method: &str) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(DEFAULT_SESSION_TTL_HOURS);

        Self {
            sub: DASHBOARD_SUBJECT.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            auth_method: auth_method.to_string(),
        }
    }
}

/// Sign claims into a compact HS256 token
pub fn create_session_token(signing_key: &[u8], claims: &SessionClaims) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| anyhow!("Failed to create JWT: {}", e))
}

pub fn validate_session_token(token: &str, signing_key: &[u8]) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data =
        decode::<SessionClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::Invalid(e.to_string()),
            })?;

    Ok(token_data.claims)
}
