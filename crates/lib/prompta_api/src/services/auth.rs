//! Authentication service: register/login/refresh/logout flows over an
//! [`AuthStore`], delegating primitives to `prompta_core::auth`.

use chrono::Utc;
use prompta_core::auth::jwt::generate_access_token;
use prompta_core::auth::refresh::{hash_refresh_token, issue_refresh_token};
use prompta_core::auth::store::AuthStore;
use prompta_core::auth::normalize_email;
use prompta_core::auth::password::{hash_password, verify_dummy, verify_password};
use prompta_core::models::auth::{
    ClientMeta, IssuedRefreshToken, NewUser, Role, SessionInfo, SessionRecord, User,
};
use prompta_core::uuid::uuidv7;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};

pub use prompta_core::auth::jwt::{decode_access_token, resolve_jwt_secret, verify_access_token};
pub use prompta_core::models::auth::TokenClaims;

/// Shortest accepted password.
const MIN_PASSWORD_LEN: usize = 6;

/// A fresh access/refresh pair bound to a user.
#[derive(Debug)]
pub struct IssuedSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: IssuedRefreshToken,
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

fn required(field: &str, value: Option<&str>) -> AppResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation("Invalid email address".into())),
    }
}

// ---------------------------------------------------------------------------
// Session issuance
// ---------------------------------------------------------------------------

/// Mint an access token and a refresh token for `user`, and store the
/// refresh token's session record (evicting the oldest past the cap).
async fn start_session(
    store: &dyn AuthStore,
    config: &ApiConfig,
    user: User,
    client: &ClientMeta,
) -> AppResult<IssuedSession> {
    let now = Utc::now();
    let access_token = generate_access_token(
        &user.id,
        user.role,
        config.jwt_secret.as_bytes(),
        config.auth.access_token_ttl,
        now,
    )?;
    let refresh_token = issue_refresh_token(config.auth.refresh_token_ttl, now);

    let record = SessionRecord {
        id: uuidv7().to_string(),
        token_hash: refresh_token.hash.clone(),
        user_agent: client.user_agent.clone(),
        ip_address: client.ip_address.clone(),
        created_at: now,
        expires_at: refresh_token.expires_at,
    };
    store
        .add_session(&user.id, record, config.auth.max_sessions)
        .await?;

    Ok(IssuedSession {
        user,
        access_token,
        refresh_token,
    })
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a new account and open its first session. First user is admin.
pub async fn register(
    store: &dyn AuthStore,
    config: &ApiConfig,
    name: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
    client: &ClientMeta,
) -> AppResult<IssuedSession> {
    let name = required("name", name)?;
    let email = normalize_email(&required("email", email)?);
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".into()))?;

    validate_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let role = if store.user_count().await? == 0 {
        Role::Admin
    } else {
        Role::User
    };

    let password_hash = hash_password(password, config.auth.bcrypt_cost)?;
    let user = store
        .create_user(NewUser {
            email,
            name,
            password_hash,
            role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    start_session(store, config, user, client).await
}

/// Authenticate with email + password and open a new session.
///
/// Unknown email and wrong password fail identically, in body and in
/// hashing work.
pub async fn login(
    store: &dyn AuthStore,
    config: &ApiConfig,
    email: Option<&str>,
    password: Option<&str>,
    client: &ClientMeta,
) -> AppResult<IssuedSession> {
    let email = normalize_email(&required("email", email)?);
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".into()))?;

    let found = match store.find_user_by_email(&email).await? {
        None => {
            verify_dummy(password, config.auth.bcrypt_cost);
            return Err(AppError::InvalidCredentials);
        }
        Some(found) => found,
    };

    // A hash that fails to parse is treated like a mismatch.
    if !verify_password(password, &found.password_hash).unwrap_or(false) {
        return Err(AppError::InvalidCredentials);
    }

    let pruned = store.prune_expired(&found.user.id, Utc::now()).await?;
    if pruned > 0 {
        debug!(user_id = %found.user.id, pruned, "pruned expired sessions");
    }

    info!(user_id = %found.user.id, "user logged in");
    start_session(store, config, found.user, client).await
}

/// Exchange a refresh token for a new pair. The presented token is
/// consumed, so it succeeds at most once.
pub async fn refresh(
    store: &dyn AuthStore,
    config: &ApiConfig,
    raw_refresh_token: Option<&str>,
    client: &ClientMeta,
) -> AppResult<IssuedSession> {
    let raw = raw_refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".into()))?;

    let token_hash = hash_refresh_token(raw);
    let user_id = match store.consume_session(&token_hash, Utc::now()).await? {
        Some(id) => id,
        None => {
            warn!("refresh rejected: no live session for token");
            return Err(AppError::Unauthorized("Invalid refresh token".into()));
        }
    };

    let user = store
        .find_user_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    debug!(user_id = %user.id, "refresh token rotated");
    start_session(store, config, user, client).await
}

/// Revoke the session behind `raw_refresh_token`, if any.
///
/// Never fails: a missing or already-revoked token and store errors are
/// logged and ignored so sign-out always completes for the client.
pub async fn logout(store: &dyn AuthStore, user_id: &str, raw_refresh_token: Option<&str>) {
    let Some(raw) = raw_refresh_token.filter(|t| !t.is_empty()) else {
        debug!(user_id, "logout without refresh token");
        return;
    };
    let token_hash = hash_refresh_token(raw);
    match store.remove_session(user_id, &token_hash).await {
        Ok(removed) => debug!(user_id, removed, "logout"),
        Err(e) => warn!(user_id, error = %e, "logout: failed to revoke session"),
    }
}

/// Revoke every session of the user. An unknown user counts as already
/// logged out.
pub async fn logout_all(store: &dyn AuthStore, user_id: &str) -> AppResult<u64> {
    if store.find_user_by_id(user_id).await?.is_none() {
        return Ok(0);
    }
    let removed = store.clear_sessions(user_id).await?;
    info!(user_id, removed, "logged out of all sessions");
    Ok(removed)
}

/// Load the user behind a verified identity.
pub async fn current_user(store: &dyn AuthStore, user_id: &str) -> AppResult<User> {
    store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// List the user's unexpired sessions, oldest first.
pub async fn active_sessions(store: &dyn AuthStore, user_id: &str) -> AppResult<Vec<SessionInfo>> {
    let now = Utc::now();
    Ok(store
        .list_sessions(user_id)
        .await?
        .iter()
        .filter(|s| !s.is_expired(now))
        .map(SessionInfo::from)
        .collect())
}

/// Load the user and require their stored role to be in `allowed`.
pub async fn authorize(
    store: &dyn AuthStore,
    user_id: &str,
    allowed: &[Role],
) -> AppResult<User> {
    let user = current_user(store, user_id).await?;
    if !allowed.contains(&user.role) {
        return Err(AppError::Forbidden("Insufficient role".into()));
    }
    Ok(user)
}
