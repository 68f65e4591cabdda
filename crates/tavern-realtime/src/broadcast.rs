//! Fan-out of session events to open streams.

use std::sync::Arc;

use tracing::{debug, error, warn};

use tavern_core::types::{ConnectionId, SessionId};
use tavern_entity::SessionEvent;

use crate::connection::{ConnectionHandle, ConnectionRegistry};
use crate::metrics::EngineMetrics;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued on.
    pub delivered: usize,
    /// Connections removed because the write failed.
    pub evicted: usize,
}

/// Delivers events to every stream open on a session.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<EngineMetrics>,
}

impl Broadcaster {
    /// Creates a broadcaster over `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<EngineMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Serialize `event` once and queue it on every connection of
    /// `session_id` except `exclude`.
    ///
    /// A connection whose write fails is cancelled and removed from the
    /// registry; the remaining connections still receive the frame.
    pub fn broadcast(
        &self,
        session_id: SessionId,
        event: &SessionEvent,
        exclude: Option<ConnectionId>,
    ) -> BroadcastReport {
        if self.registry.connection_count(session_id) == 0 {
            debug!(%session_id, event = event.event_type(), "No listeners");
            return BroadcastReport::default();
        }

        let Some(frame) = encode(event) else {
            return BroadcastReport::default();
        };

        let mut report = BroadcastReport::default();
        self.registry.for_each(session_id, |conn| {
            if Some(conn.id) == exclude {
                return;
            }
            if self.deliver(conn, frame.clone()) {
                report.delivered += 1;
            } else {
                report.evicted += 1;
            }
        });

        self.metrics.record_broadcast(report.delivered, report.evicted);
        debug!(
            %session_id,
            event = event.event_type(),
            delivered = report.delivered,
            evicted = report.evicted,
            "Broadcast event"
        );
        report
    }

    /// Queue `event` on a single connection.
    pub fn send_to(&self, conn: &ConnectionHandle, event: &SessionEvent) -> bool {
        match encode(event) {
            Some(frame) => self.deliver(conn, frame),
            None => false,
        }
    }

    fn deliver(&self, conn: &ConnectionHandle, frame: Arc<str>) -> bool {
        match conn.try_send(frame) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    connection_id = %conn.id,
                    user_id = %conn.user_id,
                    error = %e,
                    "Evicting connection after failed write"
                );
                conn.cancel();
                self.registry.remove(conn.session_id, conn.id);
                false
            }
        }
    }
}

fn encode(event: &SessionEvent) -> Option<Arc<str>> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!(event = event.event_type(), error = %e, "Failed to serialize event");
            None
        }
    }
}
