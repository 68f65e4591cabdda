//! Chat, room and read-state handlers.

use axum::Json;
use axum::extract::State;

use tavern_core::result::AppResult;
use tavern_entity::session::normalize_room_id;
use tavern_entity::{ChatMessage, ChatRoom};
use tavern_service::session::NewChatRoom;

use crate::dto::request::{CreateChatRoomRequest, MarkReadRequest, SendMessageRequest};
use crate::dto::response::{ApiResponse, MarkReadResponse, UnreadResponse};
use crate::dto::validated;
use crate::extractors::{AuthUser, SessionPath};
use crate::state::AppState;

/// POST /api/sessions/{id}/chat
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<ChatMessage>>> {
    let req = validated(req)?;
    let message = state
        .session_service
        .send_chat(&auth, id, &req.message, req.kind, req.room_id.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(message)))
}

/// GET /api/sessions/{id}/chat-rooms
pub async fn list_rooms(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Json<ApiResponse<Vec<ChatRoom>>>> {
    let rooms = state.session_service.list_chat_rooms(&auth, id).await?;
    Ok(Json(ApiResponse::ok(rooms)))
}

/// POST /api/sessions/{id}/chat-rooms
pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<CreateChatRoomRequest>,
) -> AppResult<Json<ApiResponse<ChatRoom>>> {
    let req = validated(req)?;
    let room = state
        .session_service
        .create_chat_room(
            &auth,
            id,
            NewChatRoom {
                name: req.name,
                description: req.description,
                is_private: req.is_private,
                allowed_users: req.allowed_users,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(room)))
}

/// POST /api/sessions/{id}/mark-read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<Json<ApiResponse<MarkReadResponse>>> {
    let room_id = normalize_room_id(req.room_id.as_deref());
    let last_message_id = state
        .session_service
        .mark_read(&auth, id, Some(&room_id), req.last_message_id)
        .await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse {
        room_id,
        last_message_id,
    })))
}

/// GET /api/sessions/{id}/unread
pub async fn unread_counts(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Json<ApiResponse<UnreadResponse>>> {
    let unread_counts = state.session_service.unread_counts(&auth, id).await?;
    Ok(Json(ApiResponse::ok(UnreadResponse { unread_counts })))
}
