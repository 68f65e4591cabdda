//! Registry of open streams, indexed by session.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use tavern_core::types::{ConnectionId, SessionId};

use super::handle::ConnectionHandle;

/// Thread-safe map of session id to the streams open on it.
///
/// Callers always get a snapshot of the current connections, so a
/// broadcast never holds a shard lock while writing to clients.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<SessionId, HashMap<ConnectionId, Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection under its session.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.sessions
            .entry(handle.session_id)
            .or_default()
            .insert(handle.id, handle);
    }

    /// Removes a connection. Removing an unknown connection is a no-op.
    /// A session left with no connections is dropped from the map.
    pub fn remove(
        &self,
        session_id: SessionId,
        connection_id: ConnectionId,
    ) -> Option<Arc<ConnectionHandle>> {
        let removed = self
            .sessions
            .get_mut(&session_id)
            .and_then(|mut conns| conns.remove(&connection_id));

        self.sessions
            .remove_if(&session_id, |_, conns| conns.is_empty());
        removed
    }

    /// Snapshot of the connections open on a session.
    pub fn connections(&self, session_id: SessionId) -> Vec<Arc<ConnectionHandle>> {
        self.sessions
            .get(&session_id)
            .map(|conns| conns.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Call `f` on each connection of a session.
    ///
    /// Iterates a snapshot, so `f` may add or remove connections.
    pub fn for_each<F>(&self, session_id: SessionId, mut f: F)
    where
        F: FnMut(&Arc<ConnectionHandle>),
    {
        for conn in self.connections(session_id) {
            f(&conn);
        }
    }

    /// Whether a connection is still registered.
    pub fn contains(&self, session_id: SessionId, connection_id: ConnectionId) -> bool {
        self.sessions
            .get(&session_id)
            .is_some_and(|conns| conns.contains_key(&connection_id))
    }

    /// Number of streams open on a session.
    pub fn connection_count(&self, session_id: SessionId) -> usize {
        self.sessions.get(&session_id).map_or(0, |conns| conns.len())
    }

    /// Number of sessions with at least one stream.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of every open connection.
    pub fn all(&self) -> Vec<Arc<ConnectionHandle>> {
        self.sessions
            .iter()
            .flat_map(|entry| entry.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }
}
