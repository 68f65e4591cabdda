//! Dice roll handler.

use axum::Json;
use axum::extract::State;

use tavern_core::result::AppResult;

use crate::dto::request::RollRequest;
use crate::dto::response::{ApiResponse, RollResponse};
use crate::dto::validated;
use crate::extractors::{AuthUser, SessionPath};
use crate::state::AppState;

/// POST /api/sessions/{id}/roll
pub async fn roll(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<RollRequest>,
) -> AppResult<Json<ApiResponse<RollResponse>>> {
    let req = validated(req)?;
    let (roll, message) = state
        .session_service
        .roll_dice(
            &auth,
            id,
            &req.expression,
            req.label.as_deref(),
            req.room_id.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::ok(RollResponse { roll, message })))
}
