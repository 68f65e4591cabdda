//! Session lifecycle and membership handlers.

use axum::Json;
use axum::extract::{Query, State};

use tavern_core::result::AppResult;
use tavern_database::SessionFilter;
use tavern_entity::{Session, SessionSummary};
use tavern_service::session::{CharacterChoice, JoinOutcome, NewSession};

use crate::dto::request::{
    AssignDmRequest, CreateSessionRequest, JoinSessionRequest, KickRequest, ListSessionsQuery,
};
use crate::dto::response::{ApiResponse, JoinResponse, LeaveResponse, MessageResponse};
use crate::dto::validated;
use crate::extractors::{AuthUser, SessionPath};
use crate::state::AppState;

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let req = validated(req)?;
    let session = state
        .session_service
        .create_session(
            &auth,
            NewSession {
                title: req.title,
                description: req.description,
                max_players: req.max_players,
                is_public: req.is_public,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// GET /api/sessions?public=true&dm_id=
pub async fn list_sessions(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListSessionsQuery>,
) -> AppResult<Json<ApiResponse<Vec<SessionSummary>>>> {
    let filter = SessionFilter {
        dm_id: query.dm_id,
        public_only: query.public.unwrap_or(false),
    };
    let sessions = state.session_service.list_sessions(&filter).await?;
    Ok(Json(ApiResponse::ok(sessions)))
}

/// POST /api/sessions/join
pub async fn join_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<JoinSessionRequest>,
) -> AppResult<Json<ApiResponse<JoinResponse>>> {
    let req = validated(req)?;
    let outcome = state
        .session_service
        .join_by_key(
            &auth,
            &req.session_key,
            CharacterChoice {
                character_id: req.character_id,
                character_name: req.character_name,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(join_response(outcome))))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Json<ApiResponse<Session>>> {
    let session = state.session_service.get_session(id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// DELETE /api/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    state.session_service.delete_session(&auth, id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Session deleted"))))
}

/// POST /api/sessions/{id}/auto-join
pub async fn auto_join(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Json<ApiResponse<JoinResponse>>> {
    let outcome = state.session_service.auto_join(&auth, id).await?;
    Ok(Json(ApiResponse::ok(join_response(outcome))))
}

/// POST /api/sessions/{id}/leave
pub async fn leave_session(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Json<ApiResponse<LeaveResponse>>> {
    let outcome = state.session_service.leave(&auth, id).await?;
    let message = if outcome.session_ended {
        "Left session; the session has ended"
    } else {
        "Left session"
    };
    Ok(Json(ApiResponse::ok(LeaveResponse {
        message: message.to_string(),
        session_ended: outcome.session_ended,
    })))
}

/// POST /api/sessions/{id}/kick
pub async fn kick_player(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<KickRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let req = validated(req)?;
    let session = state
        .session_service
        .kick(&auth, id, req.target_user_id, req.reason)
        .await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/sessions/{id}/assign-dm
pub async fn assign_dm(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
    Json(req): Json<AssignDmRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let session = state
        .session_service
        .assign_dm(&auth, id, req.dm_user_id)
        .await?;
    Ok(Json(ApiResponse::ok(session)))
}

fn join_response(outcome: JoinOutcome) -> JoinResponse {
    JoinResponse {
        session: outcome.session,
        role: outcome.role,
        newly_joined: outcome.newly_joined,
    }
}
