//! Route definitions for the Tavern HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with every route.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(session_routes())
        .merge(chat_routes())
        .merge(initiative_routes())
        .merge(realtime_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Liveness
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Session lifecycle and membership
fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(handlers::session::list_sessions).post(handlers::session::create_session),
        )
        .route("/sessions/join", post(handlers::session::join_session))
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        )
        .route("/sessions/{id}/auto-join", post(handlers::session::auto_join))
        .route("/sessions/{id}/leave", post(handlers::session::leave_session))
        .route("/sessions/{id}/kick", post(handlers::session::kick_player))
        .route("/sessions/{id}/assign-dm", post(handlers::session::assign_dm))
}

/// Chat, rooms, read state and dice
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}/chat", post(handlers::chat::send_message))
        .route(
            "/sessions/{id}/chat-rooms",
            get(handlers::chat::list_rooms).post(handlers::chat::create_room),
        )
        .route("/sessions/{id}/mark-read", post(handlers::chat::mark_read))
        .route("/sessions/{id}/unread", get(handlers::chat::unread_counts))
        .route("/sessions/{id}/roll", post(handlers::dice::roll))
}

/// Initiative tracker
fn initiative_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions/{id}/initiative",
            post(handlers::initiative::add_entry).delete(handlers::initiative::remove_entry),
        )
        .route(
            "/sessions/{id}/initiative/toggle-dead",
            post(handlers::initiative::toggle_dead),
        )
        .route(
            "/sessions/{id}/initiative/next-turn",
            post(handlers::initiative::next_turn),
        )
}

/// Event stream, presence and signaling
fn realtime_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}/events", get(handlers::events::stream_events))
        .route("/sessions/{id}/status", post(handlers::status::update_status))
        .route("/sessions/{id}/webrtc", post(handlers::webrtc::relay_signal))
}
