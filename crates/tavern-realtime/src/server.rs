//! Top-level real-time engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tavern_core::config::RealtimeConfig;
use tavern_core::error::AppError;
use tavern_core::types::{SessionId, UserId};
use tavern_entity::{SessionEvent, SessionSnapshot};

use crate::broadcast::Broadcaster;
use crate::connection::{ConnectionHandle, ConnectionRegistry};
use crate::metrics::EngineMetrics;
use crate::stream::{ConnectionGuard, EventStream};

/// Central engine tying the registry, broadcaster and metrics together.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Open streams.
    pub registry: Arc<ConnectionRegistry>,
    /// Event fan-out.
    pub broadcaster: Broadcaster,
    /// Counters.
    pub metrics: Arc<EngineMetrics>,
    config: RealtimeConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new engine.
    pub fn new(config: RealtimeConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(EngineMetrics::new());
        let broadcaster = Broadcaster::new(registry.clone(), metrics.clone());

        info!(
            buffer = config.channel_buffer_size,
            "Real-time engine initialized"
        );

        Self {
            registry,
            broadcaster,
            metrics,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Open an event stream for `user_id` on `session_id`.
    ///
    /// The stream starts with `connected` followed by a `session_update`
    /// built from `snapshot`. Every other stream on the session gets
    /// `participant_joined`.
    pub fn open_stream(
        &self,
        session_id: SessionId,
        user_id: UserId,
        username: &str,
        snapshot: SessionSnapshot,
    ) -> Result<EventStream, AppError> {
        if self.shutdown.is_cancelled() {
            return Err(AppError::service_unavailable("Server is shutting down"));
        }

        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(session_id, user_id, username, tx));

        // Greeting goes in before the handle is visible to broadcasts.
        let greeted = self
            .broadcaster
            .send_to(&handle, &SessionEvent::connected(session_id, user_id))
            && self
                .broadcaster
                .send_to(&handle, &SessionEvent::session_update(snapshot));
        if !greeted {
            handle.cancel();
            return Err(AppError::service_unavailable(
                "Could not open event stream",
            ));
        }

        self.registry.add(handle.clone());
        self.metrics.record_connect();

        let guard = ConnectionGuard::new(
            handle.clone(),
            self.registry.clone(),
            self.broadcaster.clone(),
            self.metrics.clone(),
        );

        info!(
            connection_id = %handle.id,
            %session_id,
            %user_id,
            "Event stream opened"
        );

        self.broadcaster.broadcast(
            session_id,
            &SessionEvent::participant_joined(user_id),
            Some(handle.id),
        );

        Ok(EventStream::new(rx, guard))
    }

    /// End every open stream and refuse new ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let connections = self.registry.all();
        info!(count = connections.len(), "Shutting down real-time engine");
        for conn in connections {
            conn.cancel();
        }
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }
}
