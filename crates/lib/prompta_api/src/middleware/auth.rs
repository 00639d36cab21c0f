//! Authentication middleware: access-token extraction and verification,
//! plus the role gate that runs after it.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use prompta_core::auth::AuthError;
use prompta_core::models::auth::Role;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::services::auth::{TokenClaims, authorize, decode_access_token};
use crate::services::cookies::{ACCESS_COOKIE, cookie_value};

/// Verified identity, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

/// Pull the access token from `Authorization: Bearer`, falling back to the
/// access-token cookie.
fn extract_access_token(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(header) = headers.get(AUTHORIZATION) {
        let value = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".into()))?;
        return value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()));
    }
    cookie_value(&CookieJar::from_headers(headers), ACCESS_COOKIE)
        .ok_or_else(|| AppError::Unauthorized("Missing access token".into()))
}

/// Axum middleware: verifies the access token and injects
/// [`AuthenticatedUser`] into request extensions.
///
/// Expired tokens are rejected with the `token_expired` error code so
/// clients know to call the refresh endpoint.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_access_token(request.headers()).inspect_err(|e| {
        debug!(error = %e, "auth: no usable access token");
    })?;

    let claims = decode_access_token(&token, state.config.jwt_secret.as_bytes()).map_err(|e| {
        debug!(error = %e, "auth: access token rejected");
        match e {
            AuthError::TokenExpired => AppError::TokenExpired,
            _ => AppError::Unauthorized("Invalid or expired token".into()),
        }
    })?;

    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

/// State for [`require_role`]: the app state plus the roles a route allows.
#[derive(Clone)]
pub struct RoleGate {
    pub state: AppState,
    pub allowed: &'static [Role],
}

impl RoleGate {
    pub fn new(state: AppState, allowed: &'static [Role]) -> Self {
        Self { state, allowed }
    }
}

/// Axum middleware: requires the authenticated user's stored role to be in
/// the gate's allowed set. Must run inside [`require_auth`].
pub async fn require_role(
    State(gate): State<RoleGate>,
    Extension(user): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(gate.state.store.as_ref(), &user.0.sub, gate.allowed).await?;
    Ok(next.run(request).await)
}
