//! # prompta_api
//!
//! HTTP API library for Prompta: registration, login, token refresh and
//! logout over cookie and bearer transports.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use prompta_core::auth::store::AuthStore;
use prompta_core::models::auth::Role;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, health};
use crate::middleware::auth::{RoleGate, require_auth, require_role};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User and session store.
    pub store: Arc<dyn AuthStore>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Run embedded database migrations.
///
/// Delegates to `prompta_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    prompta_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler));

    // Admin routes (require auth + admin role)
    let admin_routes = Router::new()
        .route(
            routes::GET_ADMIN_USER_SESSIONS,
            get(admin::user_sessions_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            RoleGate::new(state.clone(), &[Role::Admin]),
            require_role,
        ));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::POST_AUTH_LOGOUT_ALL, post(auth::logout_all_handler))
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(routes::GET_AUTH_SESSIONS, get(auth::sessions_handler))
        .merge(admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
