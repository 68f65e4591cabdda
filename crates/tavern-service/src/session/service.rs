//! Session service core: loading, optimistic writes, and publishing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tavern_core::config::SessionConfig;
use tavern_core::error::AppError;
use tavern_core::result::AppResult;
use tavern_core::types::SessionId;
use tavern_database::{SessionFilter, SessionRepository};
use tavern_entity::{Session, SessionEvent, SessionSummary};
use tavern_realtime::Broadcaster;

use crate::context::RequestContext;

use super::key::generate_session_key;
use super::types::NewSession;

/// Service for game session operations.
///
/// Every mutation goes through [`SessionService::mutate`], which re-reads
/// the document and re-applies the change when another writer got there
/// first. Events are only published after the write is durable.
#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn SessionRepository>,
    broadcaster: Broadcaster,
    config: SessionConfig,
    snapshot_limit: usize,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionService {
    /// Creates a new session service.
    pub fn new(
        repo: Arc<dyn SessionRepository>,
        broadcaster: Broadcaster,
        config: SessionConfig,
        snapshot_limit: usize,
    ) -> Self {
        Self {
            repo,
            broadcaster,
            config,
            snapshot_limit,
        }
    }

    /// Number of chat messages carried in snapshots.
    pub fn snapshot_limit(&self) -> usize {
        self.snapshot_limit
    }

    /// Creates a session owned and refereed by the caller.
    pub async fn create_session(
        &self,
        ctx: &RequestContext,
        input: NewSession,
    ) -> AppResult<Session> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        let max_players = input.max_players.unwrap_or(self.config.default_max_players);
        if max_players == 0 {
            return Err(AppError::validation("maxPlayers must be at least 1"));
        }
        let description = input.description.unwrap_or_default();

        for attempt in 1..=self.config.max_key_attempts {
            let session = Session::new(
                title,
                description.trim(),
                generate_session_key(),
                ctx.user_id,
                &ctx.username,
                max_players,
                input.is_public,
            );

            match self.repo.create(&session).await {
                Ok(created) => {
                    info!(
                        session_id = %created.id,
                        session_key = %created.session_key,
                        creator = %ctx.user_id,
                        "Session created"
                    );
                    return Ok(created);
                }
                Err(e) if e.is_conflict() => {
                    debug!(attempt, "Session key collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal("Failed to generate a unique session key"))
    }

    /// Active sessions matching `filter`, newest first.
    pub async fn list_sessions(&self, filter: &SessionFilter) -> AppResult<Vec<SessionSummary>> {
        let sessions = self.repo.list(filter).await?;
        Ok(sessions.iter().map(Session::summary).collect())
    }

    /// Gets a session by ID.
    pub async fn get_session(&self, id: SessionId) -> AppResult<Session> {
        self.load(id).await
    }

    /// Deletes a session. Creator only.
    pub async fn delete_session(&self, ctx: &RequestContext, id: SessionId) -> AppResult<()> {
        let session = self.load(id).await?;
        if !session.is_creator(ctx.user_id) {
            return Err(AppError::authorization(
                "Only the session creator can delete this session",
            ));
        }

        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("Session not found"));
        }

        info!(session_id = %id, deleted_by = %ctx.user_id, "Session deleted");
        Ok(())
    }

    pub(crate) async fn load(&self, id: SessionId) -> AppResult<Session> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))
    }

    pub(crate) async fn load_by_key(&self, key: &str) -> AppResult<Session> {
        let key = key.trim().to_uppercase();
        if key.is_empty() {
            return Err(AppError::validation("Session key is required"));
        }
        match self.repo.find_by_key(&key).await? {
            Some(session) if session.is_active => Ok(session),
            _ => Err(AppError::not_found("Session not found or inactive")),
        }
    }

    /// Load, apply `apply`, and write back with a version check.
    ///
    /// On a version conflict the document is reloaded and `apply` runs
    /// again, up to `session.max_mutation_retries` attempts. An error
    /// from `apply` aborts without writing.
    pub(crate) async fn mutate<T, F>(&self, id: SessionId, mut apply: F) -> AppResult<(Session, T)>
    where
        F: FnMut(&mut Session) -> AppResult<T> + Send,
        T: Send,
    {
        let attempts = self.config.max_mutation_retries.max(1);
        let mut attempt = 1;

        loop {
            let mut session = self.load(id).await?;
            let outcome = apply(&mut session)?;
            session.touch();

            match self.repo.update(&session).await {
                Ok(saved) => return Ok((saved, outcome)),
                Err(e) if e.is_conflict() && attempt < attempts => {
                    debug!(session_id = %id, attempt, "Version conflict, retrying mutation");
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_conflict() {
                        warn!(session_id = %id, attempts, "Mutation kept conflicting");
                    }
                    return Err(e);
                }
            }
        }
    }

    pub(crate) fn publish(&self, session: &Session, event: SessionEvent) {
        self.broadcaster.broadcast(session.id, &event, None);
    }

    pub(crate) fn publish_snapshot(&self, session: &Session) {
        self.publish(
            session,
            SessionEvent::session_update(session.snapshot(self.snapshot_limit)),
        );
    }
}

/// Players, the DM and the creator may act on a session.
pub(crate) fn require_participant(session: &Session, ctx: &RequestContext) -> AppResult<()> {
    if session.is_participant(ctx.user_id) {
        Ok(())
    } else {
        Err(AppError::authorization(
            "You are not a participant in this session",
        ))
    }
}

/// DM-level actions.
pub(crate) fn require_referee(session: &Session, ctx: &RequestContext) -> AppResult<()> {
    if session.can_referee(ctx.user_id) {
        Ok(())
    } else {
        Err(AppError::authorization(
            "Only the DM or session creator can do this",
        ))
    }
}

pub(crate) fn require_creator(
    session: &Session,
    ctx: &RequestContext,
    action: &str,
) -> AppResult<()> {
    if session.is_creator(ctx.user_id) {
        Ok(())
    } else {
        Err(AppError::authorization(format!(
            "Only the session creator can {action}"
        )))
    }
}

/// The room exists and the caller may see it.
pub(crate) fn require_room(
    session: &Session,
    room_id: &str,
    ctx: &RequestContext,
) -> AppResult<()> {
    let room = session
        .room(room_id)
        .ok_or_else(|| AppError::not_found("Chat room not found"))?;
    if room.is_visible_to(ctx.user_id, session.is_creator(ctx.user_id)) {
        Ok(())
    } else {
        Err(AppError::authorization("You do not have access to this room"))
    }
}

/// Name shown next to the caller's messages.
pub(crate) fn display_name(session: &Session, ctx: &RequestContext) -> String {
    session
        .player(ctx.user_id)
        .map(|p| p.username.clone())
        .unwrap_or_else(|| ctx.username.clone())
}
