//! The persistence seam for users and their refresh-token sessions.
//!
//! Two implementations ship with the crate: [`PgAuthStore`](super::queries::PgAuthStore)
//! for PostgreSQL and [`MemoryAuthStore`](super::memory::MemoryAuthStore) for
//! tests and database-less local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::AuthError;
use crate::models::auth::{NewUser, SessionRecord, User, UserWithPassword};

/// User and session persistence.
///
/// Every mutating call is a single atomic operation in the backing store.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Count all users.
    async fn user_count(&self) -> Result<u64, AuthError>;

    /// Create a user. Fails with [`AuthError::Conflict`] if the email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError>;

    /// Fetch a user (with password hash) by normalized email.
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserWithPassword>, AuthError>;

    /// Fetch a user by ID.
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError>;

    /// Append a session. When the user already holds `max_sessions`
    /// sessions, the oldest by insertion order are evicted first.
    async fn add_session(
        &self,
        user_id: &str,
        record: SessionRecord,
        max_sessions: usize,
    ) -> Result<(), AuthError>;

    /// Delete the user's sessions whose hash equals `token_hash`.
    /// Returns the number removed.
    async fn remove_session(&self, user_id: &str, token_hash: &str) -> Result<u64, AuthError>;

    /// Delete the user's sessions that expire at or before `now`.
    async fn prune_expired(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, AuthError>;

    /// Delete every session of the user.
    async fn clear_sessions(&self, user_id: &str) -> Result<u64, AuthError>;

    /// Find the session with `token_hash` that is still valid at `now` and
    /// delete it in the same operation. Returns the owning user ID.
    ///
    /// At most one caller can consume a given hash.
    async fn consume_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AuthError>;

    /// List the user's sessions, oldest first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>, AuthError>;
}
