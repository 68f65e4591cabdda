//! WebRTC signaling relay handler.

use axum::Json;
use axum::extract::State;

use tavern_core::result::AppResult;

use crate::dto::request::WebrtcSignalRequest;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::dto::validated;
use crate::extractors::{AuthUser, SessionPath};
use crate::state::AppState;

/// POST /api/sessions/{id}/webrtc
pub async fn relay_signal(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<WebrtcSignalRequest>,
) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    let req = validated(req)?;
    state
        .session_service
        .relay_signal(&auth, id, &req.signal_type, req.data, req.target_user_id)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Signal relayed"))))
}
