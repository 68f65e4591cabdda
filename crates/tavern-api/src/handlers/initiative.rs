//! Initiative tracker handlers.

use axum::Json;
use axum::extract::{Query, State};

use tavern_core::result::AppResult;
use tavern_entity::InitiativeEntry;

use crate::dto::request::{AddInitiativeRequest, InitiativeEntryRequest};
use crate::dto::response::{ApiResponse, InitiativeResponse, TurnResponse};
use crate::dto::validated;
use crate::extractors::{AuthUser, SessionPath};
use crate::state::AppState;

/// POST /api/sessions/{id}/initiative
pub async fn add_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<AddInitiativeRequest>,
) -> AppResult<Json<ApiResponse<InitiativeResponse>>> {
    let req = validated(req)?;
    let (entry, roll) = state
        .session_service
        .add_initiative(&auth, id, &req.character_name, &req.expression)
        .await?;
    Ok(Json(ApiResponse::ok(InitiativeResponse { entry, roll })))
}

/// DELETE /api/sessions/{id}/initiative?entryId=
pub async fn remove_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Query(req): Query<InitiativeEntryRequest>,
) -> AppResult<Json<ApiResponse<InitiativeEntry>>> {
    let removed = state
        .session_service
        .remove_initiative(&auth, id, req.entry_id)
        .await?;
    Ok(Json(ApiResponse::ok(removed)))
}

/// POST /api/sessions/{id}/initiative/toggle-dead
pub async fn toggle_dead(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<InitiativeEntryRequest>,
) -> AppResult<Json<ApiResponse<InitiativeEntry>>> {
    let entry = state
        .session_service
        .toggle_dead(&auth, id, req.entry_id)
        .await?;
    Ok(Json(ApiResponse::ok(entry)))
}

/// POST /api/sessions/{id}/initiative/next-turn
pub async fn next_turn(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Json<ApiResponse<TurnResponse>>> {
    let current_turn = state.session_service.next_turn(&auth, id).await?;
    Ok(Json(ApiResponse::ok(TurnResponse { current_turn })))
}
