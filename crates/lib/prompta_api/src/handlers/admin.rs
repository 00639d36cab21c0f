//! Admin-only request handlers. Mounted behind `require_role(Admin)`.

use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{SessionListResponse, SessionView};
use crate::services::auth;

/// `GET /api/admin/users/{id}/sessions` — active sessions of any user.
pub async fn user_sessions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<SessionListResponse>> {
    let user = auth::current_user(state.store.as_ref(), &user_id).await?;
    let sessions = auth::active_sessions(state.store.as_ref(), &user.id).await?;
    Ok(Json(SessionListResponse {
        sessions: sessions.into_iter().map(SessionView::from).collect(),
    }))
}
