//! Presence report handler.

use axum::Json;
use axum::extract::State;

use tavern_core::result::AppResult;
use tavern_service::session::StatusChange;

use crate::dto::response::ApiResponse;
use crate::extractors::{AuthUser, SessionPath, StatusPayload};
use crate::state::AppState;

/// POST /api/sessions/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    payload: StatusPayload,
) -> AppResult<Json<ApiResponse<StatusChange>>> {
    let change = state
        .session_service
        .update_status(&auth, id, payload.is_online)
        .await?;
    Ok(Json(ApiResponse::ok(change)))
}
