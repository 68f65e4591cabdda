//! Session event stream (Server-Sent Events).

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tracing::debug;

use tavern_core::error::AppError;
use tavern_core::result::AppResult;

use crate::extractors::{AuthUser, SessionPath};
use crate::state::AppState;

/// GET /api/sessions/{id}/events
///
/// Authentication and the session lookup happen before the stream is
/// registered, so a rejected request never touches the registry.
pub async fn stream_events(
    State(state): State<AppState>,
    auth: AuthUser,
    SessionPath(id): SessionPath,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = state.session_service.get_session(id).await?;
    if !session.is_participant(auth.user_id) {
        return Err(AppError::authorization(
            "You are not a participant in this session",
        ));
    }

    let snapshot = session.snapshot(state.config.realtime.snapshot_message_limit);
    let stream = state
        .realtime
        .open_stream(id, auth.user_id, &auth.username, snapshot)?;

    debug!(session_id = %id, user_id = %auth.user_id, "Streaming session events");

    let events = stream.map(|frame| Ok::<_, Infallible>(Event::default().data(&*frame)));
    let keep_alive =
        KeepAlive::new().interval(Duration::from_secs(state.config.realtime.keep_alive_seconds));

    Ok(Sse::new(events).keep_alive(keep_alive))
}
