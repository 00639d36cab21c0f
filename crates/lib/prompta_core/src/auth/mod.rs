//! Authentication and authorization logic.
//!
//! Provides password hashing, access-token (JWT) management, refresh-token
//! minting, and the session store shared by the HTTP layer.

pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod refresh;
pub mod store;

use chrono::Duration;
use thiserror::Error;

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Default cap on concurrent sessions per user.
pub const DEFAULT_MAX_SESSIONS: usize = 5;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token lifetimes and session limits, built once at startup and passed
/// to the auth flows.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub max_sessions: usize,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            max_sessions: DEFAULT_MAX_SESSIONS,
            bcrypt_cost: password::DEFAULT_BCRYPT_COST,
        }
    }
}

/// Trim and lower-case an email for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn default_config_matches_documented_limits() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.access_token_ttl, Duration::minutes(15));
        assert_eq!(cfg.refresh_token_ttl, Duration::days(7));
        assert_eq!(cfg.max_sessions, 5);
    }
}
