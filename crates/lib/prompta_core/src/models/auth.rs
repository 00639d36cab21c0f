//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! models (which use camelCase on the wire).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Domain user. Never carries the password hash or the session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// Input for creating a user. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

/// Requesting client, recorded on each session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMeta {
    pub user_agent: String,
    pub ip_address: String,
}

impl Default for ClientMeta {
    fn default() -> Self {
        Self {
            user_agent: "unknown".into(),
            ip_address: "unknown".into(),
        }
    }
}

/// Refresh-token session as held by the store.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    /// SHA-256 hex digest of the raw refresh token.
    pub token_hash: String,
    pub user_agent: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the record is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Session metadata safe to show to a user (no token hash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    pub user_agent: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionInfo {
    fn from(r: &SessionRecord) -> Self {
        Self {
            id: r.id.clone(),
            user_agent: r.user_agent.clone(),
            ip_address: r.ip_address.clone(),
            created_at: r.created_at,
            expires_at: r.expires_at,
        }
    }
}

/// A freshly minted refresh token. `secret` goes to the client only;
/// `hash` is what gets persisted.
#[derive(Clone)]
pub struct IssuedRefreshToken {
    pub secret: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedRefreshToken")
            .field("secret", &"<redacted>")
            .field("hash", &self.hash)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID (standard JWT `sub` claim).
    pub sub: String,
    /// Role at issue time. Authorization re-reads the stored role.
    pub role: Role,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn session_expiry_is_inclusive_of_now() {
        let now = Utc::now();
        let record = SessionRecord {
            id: "s".into(),
            token_hash: "h".into(),
            user_agent: "ua".into(),
            ip_address: "127.0.0.1".into(),
            created_at: now - Duration::days(7),
            expires_at: now,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn issued_refresh_token_debug_hides_secret() {
        let token = IssuedRefreshToken {
            secret: "super-secret".into(),
            hash: "abc".into(),
            expires_at: Utc::now(),
        };
        let out = format!("{token:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("<redacted>"));
    }
}
