//! In-memory [`AuthStore`] for tests and database-less local runs.
//!
//! All state sits behind one lock, so each trait call is a single
//! critical section and `consume_session` is atomic across tasks.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AuthError;
use super::store::AuthStore;
use crate::models::auth::{NewUser, SessionRecord, User, UserWithPassword};

/// A stored user document with its embedded session list.
#[derive(Debug, Clone)]
struct UserDoc {
    user: User,
    password_hash: String,
    /// Insertion order: index 0 is the oldest session.
    sessions: Vec<SessionRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, UserDoc>,
    /// Normalized email → user ID.
    by_email: HashMap<String, String>,
}

/// In-memory user and session store.
#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    inner: RwLock<Inner>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn user_count(&self) -> Result<u64, AuthError> {
        Ok(self.inner.read().await.users.len() as u64)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        let mut inner = self.inner.write().await;
        if inner.by_email.contains_key(&new_user.email) {
            return Err(AuthError::Conflict("Email already registered".into()));
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            name: new_user.name,
            role: new_user.role,
        };
        inner.by_email.insert(user.email.clone(), user.id.clone());
        inner.users.insert(
            user.id.clone(),
            UserDoc {
                user: user.clone(),
                password_hash: new_user.password_hash,
                sessions: Vec::new(),
            },
        );
        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .map(|doc| UserWithPassword {
                user: doc.user.clone(),
                password_hash: doc.password_hash.clone(),
            }))
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .get(user_id)
            .map(|doc| doc.user.clone()))
    }

    async fn add_session(
        &self,
        user_id: &str,
        record: SessionRecord,
        max_sessions: usize,
    ) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        let doc = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| AuthError::NotFound("User not found".into()))?;
        let keep = max_sessions.saturating_sub(1);
        if doc.sessions.len() > keep {
            let excess = doc.sessions.len() - keep;
            doc.sessions.drain(..excess);
        }
        doc.sessions.push(record);
        Ok(())
    }

    async fn remove_session(&self, user_id: &str, token_hash: &str) -> Result<u64, AuthError> {
        let mut inner = self.inner.write().await;
        let Some(doc) = inner.users.get_mut(user_id) else {
            return Ok(0);
        };
        let before = doc.sessions.len();
        doc.sessions.retain(|s| s.token_hash != token_hash);
        Ok((before - doc.sessions.len()) as u64)
    }

    async fn prune_expired(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut inner = self.inner.write().await;
        let Some(doc) = inner.users.get_mut(user_id) else {
            return Ok(0);
        };
        let before = doc.sessions.len();
        doc.sessions.retain(|s| !s.is_expired(now));
        Ok((before - doc.sessions.len()) as u64)
    }

    async fn clear_sessions(&self, user_id: &str) -> Result<u64, AuthError> {
        let mut inner = self.inner.write().await;
        let Some(doc) = inner.users.get_mut(user_id) else {
            return Ok(0);
        };
        let removed = doc.sessions.len() as u64;
        doc.sessions.clear();
        Ok(removed)
    }

    async fn consume_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AuthError> {
        let mut inner = self.inner.write().await;
        for (user_id, doc) in inner.users.iter_mut() {
            if let Some(pos) = doc
                .sessions
                .iter()
                .position(|s| s.token_hash == token_hash && !s.is_expired(now))
            {
                doc.sessions.remove(pos);
                return Ok(Some(user_id.clone()));
            }
        }
        Ok(None)
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>, AuthError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .get(user_id)
            .map(|doc| doc.sessions.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::models::auth::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: "Ada".into(),
            password_hash: "hash".into(),
            role: Role::User,
        }
    }

    fn session(hash: &str, expires_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: crate::uuid::uuidv7().to_string(),
            token_hash: hash.into(),
            user_agent: "test".into(),
            ip_address: "127.0.0.1".into(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryAuthStore::new();
        store.create_user(new_user("a@x.com")).await.unwrap();
        let err = store.create_user(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
        assert_eq!(store.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn add_session_evicts_oldest_beyond_capacity() {
        let store = MemoryAuthStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        let later = Utc::now() + Duration::days(7);
        for i in 0..7 {
            store
                .add_session(&user.id, session(&format!("h{i}"), later), 5)
                .await
                .unwrap();
        }
        let hashes: Vec<_> = store
            .list_sessions(&user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.token_hash)
            .collect();
        assert_eq!(hashes, vec!["h2", "h3", "h4", "h5", "h6"]);
    }

    #[tokio::test]
    async fn eviction_ignores_individual_expiry() {
        let store = MemoryAuthStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        let now = Utc::now();
        // Oldest record has the latest expiry; it is still evicted first.
        store
            .add_session(&user.id, session("old", now + Duration::days(30)), 2)
            .await
            .unwrap();
        store
            .add_session(&user.id, session("mid", now + Duration::days(1)), 2)
            .await
            .unwrap();
        store
            .add_session(&user.id, session("new", now + Duration::days(1)), 2)
            .await
            .unwrap();
        let hashes: Vec<_> = store
            .list_sessions(&user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.token_hash)
            .collect();
        assert_eq!(hashes, vec!["mid", "new"]);
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = MemoryAuthStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        let now = Utc::now();
        store
            .add_session(&user.id, session("h", now + Duration::days(1)), 5)
            .await
            .unwrap();
        assert_eq!(
            store.consume_session("h", now).await.unwrap(),
            Some(user.id.clone())
        );
        assert_eq!(store.consume_session("h", now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn consume_rejects_expired_record() {
        let store = MemoryAuthStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        let now = Utc::now();
        store
            .add_session(&user.id, session("h", now - Duration::seconds(1)), 5)
            .await
            .unwrap();
        assert_eq!(store.consume_session("h", now).await.unwrap(), None);
        // Still present until pruned.
        assert_eq!(store.list_sessions(&user.id).await.unwrap().len(), 1);
        assert_eq!(store.prune_expired(&user.id, now).await.unwrap(), 1);
        assert!(store.list_sessions(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_consume_has_one_winner() {
        let store = Arc::new(MemoryAuthStore::new());
        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        let now = Utc::now();
        store
            .add_session(&user.id, session("h", now + Duration::days(1)), 5)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.consume_session("h", now).await.unwrap()
            }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn remove_and_clear_are_idempotent() {
        let store = MemoryAuthStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        let later = Utc::now() + Duration::days(1);
        store.add_session(&user.id, session("a", later), 5).await.unwrap();
        store.add_session(&user.id, session("b", later), 5).await.unwrap();

        assert_eq!(store.remove_session(&user.id, "a").await.unwrap(), 1);
        assert_eq!(store.remove_session(&user.id, "a").await.unwrap(), 0);
        assert_eq!(store.clear_sessions(&user.id).await.unwrap(), 1);
        assert_eq!(store.clear_sessions(&user.id).await.unwrap(), 0);
        assert_eq!(store.clear_sessions("missing").await.unwrap(), 0);
    }
}
