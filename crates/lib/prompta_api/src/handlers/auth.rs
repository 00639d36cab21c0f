//! Authentication request handlers.
//!
//! Tokens travel both in the JSON body (access token only) and in httpOnly
//! cookies (both tokens).

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::Client;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AuthResponse, EmptyResponse, LoginRequest, RefreshResponse, RefreshTokenBody,
    RegisterRequest, SessionListResponse, SessionView, UserProfile,
};
use crate::services::auth::{self, IssuedSession};
use crate::services::cookies::{
    REFRESH_COOKIE, clear_token_cookies, cookie_value, set_token_cookies,
};

/// Attach both token cookies for a freshly issued session.
fn with_session_cookies(state: &AppState, jar: CookieJar, session: &IssuedSession) -> CookieJar {
    let auth_cfg = &state.config.auth;
    set_token_cookies(
        jar,
        &session.access_token,
        auth_cfg.access_token_ttl.num_seconds(),
        &session.refresh_token.secret,
        auth_cfg.refresh_token_ttl.num_seconds(),
        state.config.cookie_secure,
    )
}

/// Refresh token from the cookie, else from an optional JSON body.
fn presented_refresh_token(jar: &CookieJar, body: &[u8]) -> AppResult<Option<String>> {
    if let Some(token) = cookie_value(jar, REFRESH_COOKIE) {
        return Ok(Some(token));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: RefreshTokenBody = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;
    Ok(parsed.refresh_token.filter(|t| !t.is_empty()))
}

/// `POST /api/auth/register` — create an account and sign it in.
pub async fn register_handler(
    State(state): State<AppState>,
    Client(client): Client,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let session = auth::register(
        state.store.as_ref(),
        &state.config,
        body.name.as_deref(),
        body.email.as_deref(),
        body.password.as_deref(),
        &client,
    )
    .await?;
    let jar = with_session_cookies(&state, jar, &session);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            access_token: session.access_token,
            user: UserProfile::from(session.user),
        }),
    ))
}

/// `POST /api/auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Client(client): Client,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let session = auth::login(
        state.store.as_ref(),
        &state.config,
        body.email.as_deref(),
        body.password.as_deref(),
        &client,
    )
    .await?;
    let jar = with_session_cookies(&state, jar, &session);
    Ok((
        jar,
        Json(AuthResponse {
            access_token: session.access_token,
            user: UserProfile::from(session.user),
        }),
    ))
}

/// `POST /api/auth/refresh` — rotate the refresh token and mint a new
/// access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Client(client): Client,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<RefreshResponse>)> {
    let presented = presented_refresh_token(&jar, &body)?;
    let session = auth::refresh(
        state.store.as_ref(),
        &state.config,
        presented.as_deref(),
        &client,
    )
    .await?;
    let jar = with_session_cookies(&state, jar, &session);
    Ok((
        jar,
        Json(RefreshResponse {
            access_token: session.access_token,
        }),
    ))
}

/// `POST /api/auth/logout` — clear cookies and revoke the presented session.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
    body: Bytes,
) -> (CookieJar, Json<EmptyResponse>) {
    // Unreadable bodies are ignored: logout always succeeds.
    let presented = presented_refresh_token(&jar, &body).unwrap_or(None);
    let jar = clear_token_cookies(jar, state.config.cookie_secure);
    auth::logout(state.store.as_ref(), &user.0.sub, presented.as_deref()).await;
    (jar, Json(EmptyResponse {}))
}

/// `POST /api/auth/logout-all` — revoke every session of the caller.
pub async fn logout_all_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<EmptyResponse>)> {
    auth::logout_all(state.store.as_ref(), &user.0.sub).await?;
    let jar = clear_token_cookies(jar, state.config.cookie_secure);
    Ok((jar, Json(EmptyResponse {})))
}

/// `GET /api/auth/me` — the caller's profile.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserProfile>> {
    let user = auth::current_user(state.store.as_ref(), &user.0.sub).await?;
    Ok(Json(UserProfile::from(user)))
}

/// `GET /api/auth/sessions` — the caller's active sessions.
pub async fn sessions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<SessionListResponse>> {
    let sessions = auth::active_sessions(state.store.as_ref(), &user.0.sub).await?;
    Ok(Json(SessionListResponse {
        sessions: sessions.into_iter().map(SessionView::from).collect(),
    }))
}
