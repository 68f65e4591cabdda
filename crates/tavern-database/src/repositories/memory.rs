//! Process-local session store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use tavern_core::error::AppError;
use tavern_core::result::AppResult;
use tavern_core::types::SessionId;
use tavern_entity::session::Session;

use super::{SessionFilter, SessionRepository};

/// DashMap-backed store. The version check in `update` runs while the
/// shard lock for that session is held, so it is atomic.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<SessionId, Session>,
    keys: DashMap<String, SessionId>,
}

impl MemorySessionRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|s| s.value().clone()))
    }

    async fn find_by_key(&self, key: &str) -> AppResult<Option<Session>> {
        let id = match self.keys.get(&key.to_uppercase()) {
            Some(id) => *id.value(),
            None => return Ok(None),
        };
        self.find_by_id(id).await
    }

    async fn list(&self, filter: &SessionFilter) -> AppResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| filter.matches(s.value()))
            .map(|s| s.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn create(&self, session: &Session) -> AppResult<Session> {
        match self.keys.entry(session.session_key.to_uppercase()) {
            Entry::Occupied(_) => {
                return Err(AppError::conflict(format!(
                    "Session key {} is already in use",
                    session.session_key
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(session.id);
            }
        }
        self.sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn update(&self, session: &Session) -> AppResult<Session> {
        let mut stored = self
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| AppError::not_found("Session not found"))?;

        if stored.version != session.version {
            return Err(AppError::conflict("Session was modified concurrently"));
        }

        let mut next = session.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: SessionId) -> AppResult<bool> {
        match self.sessions.remove(&id) {
            Some((_, session)) => {
                self.keys.remove(&session.session_key.to_uppercase());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
