//! PostgreSQL-backed [`AuthStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use super::store::AuthStore;
use crate::models::auth::{NewUser, Role, SessionRecord, User, UserWithPassword};

/// `23505`: unique_violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// User and session store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_role(role: &str) -> Result<Role, AuthError> {
    role.parse().map_err(AuthError::Internal)
}

type SessionRow = (
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn session_from_row(
    (id, token_hash, user_agent, ip_address, created_at, expires_at): SessionRow,
) -> SessionRecord {
    SessionRecord {
        id,
        token_hash,
        user_agent,
        ip_address,
        created_at,
        expires_at,
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn user_count(&self) -> Result<u64, AuthError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        let result = sqlx::query_scalar::<_, String>(
            "INSERT INTO users (email, name, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING id::text",
        )
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(User {
                id,
                email: new_user.email,
                name: new_user.name,
                role: new_user.role,
            }),
            Err(sqlx::Error::Database(db))
                if db.code().as_deref() == Some(PG_UNIQUE_VIOLATION) =>
            {
                Err(AuthError::Conflict("Email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, (String, String, String, String, String)>(
            "SELECT id::text, email, name, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, email, name, role, password_hash)| {
            Ok(UserWithPassword {
                user: User {
                    id,
                    email,
                    name,
                    role: parse_role(&role)?,
                },
                password_hash,
            })
        })
        .transpose()
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        // A malformed ID cannot match any row.
        if uuid::Uuid::parse_str(user_id).is_err() {
            return Ok(None);
        }
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT email, name, role FROM users WHERE id = $1::uuid",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(email, name, role)| {
            Ok(User {
                id: user_id.to_string(),
                email,
                name,
                role: parse_role(&role)?,
            })
        })
        .transpose()
    }

    async fn add_session(
        &self,
        user_id: &str,
        record: SessionRecord,
        max_sessions: usize,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;

        // Serialize session edits per user.
        let locked = sqlx::query_scalar::<_, String>(
            "SELECT id::text FROM users WHERE id = $1::uuid FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(AuthError::NotFound("User not found".into()));
        }

        sqlx::query(
            "INSERT INTO refresh_sessions \
             (id, user_id, token_hash, user_agent, ip_address, created_at, expires_at) \
             VALUES ($1::uuid, $2::uuid, $3, $4, $5, $6, $7)",
        )
        .bind(&record.id)
        .bind(user_id)
        .bind(&record.token_hash)
        .bind(&record.user_agent)
        .bind(&record.ip_address)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM refresh_sessions WHERE id IN ( \
                 SELECT id FROM refresh_sessions WHERE user_id = $1::uuid \
                 ORDER BY seq DESC OFFSET $2 \
             )",
        )
        .bind(user_id)
        .bind(max_sessions as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_session(&self, user_id: &str, token_hash: &str) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "DELETE FROM refresh_sessions WHERE user_id = $1::uuid AND token_hash = $2",
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn prune_expired(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "DELETE FROM refresh_sessions WHERE user_id = $1::uuid AND expires_at <= $2",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn clear_sessions(&self, user_id: &str) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1::uuid")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn consume_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AuthError> {
        // Lookup and invalidate in one statement: two racing callers cannot
        // both see the row.
        let row = sqlx::query_scalar::<_, String>(
            "DELETE FROM refresh_sessions \
             WHERE token_hash = $1 AND expires_at > $2 \
             RETURNING user_id::text",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>, AuthError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT id::text, token_hash, user_agent, ip_address, created_at, expires_at \
             FROM refresh_sessions WHERE user_id = $1::uuid ORDER BY seq ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(session_from_row).collect())
    }
}
