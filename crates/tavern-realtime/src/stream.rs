//! Guarded per-connection event streams.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::WaitForCancellationFutureOwned;
use tracing::info;

use tavern_core::types::ConnectionId;
use tavern_entity::SessionEvent;

use crate::broadcast::Broadcaster;
use crate::connection::{ConnectionHandle, ConnectionRegistry};
use crate::metrics::EngineMetrics;

/// Tears a connection down when the stream goes away.
///
/// Teardown runs at most once no matter how many paths reach it
/// (client disconnect, eviction, server shutdown, explicit close).
#[derive(Debug)]
pub struct ConnectionGuard {
    handle: Arc<ConnectionHandle>,
    registry: Arc<ConnectionRegistry>,
    broadcaster: Broadcaster,
    metrics: Arc<EngineMetrics>,
    closed: AtomicBool,
}

impl ConnectionGuard {
    pub(crate) fn new(
        handle: Arc<ConnectionHandle>,
        registry: Arc<ConnectionRegistry>,
        broadcaster: Broadcaster,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            handle,
            registry,
            broadcaster,
            metrics,
            closed: AtomicBool::new(false),
        }
    }

    /// Id of the guarded connection.
    pub fn connection_id(&self) -> ConnectionId {
        self.handle.id
    }

    /// Whether teardown already ran.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Unregister the connection and tell the rest of the session.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.handle.cancel();
        self.registry
            .remove(self.handle.session_id, self.handle.id);
        self.metrics.record_disconnect();

        info!(
            connection_id = %self.handle.id,
            session_id = %self.handle.session_id,
            user_id = %self.handle.user_id,
            "Event stream closed"
        );

        self.broadcaster.broadcast(
            self.handle.session_id,
            &SessionEvent::participant_left(self.handle.user_id),
            None,
        );
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// Serialized event frames for one connection.
///
/// Ends when the connection is cancelled. Dropping it runs the
/// connection's teardown.
pub struct EventStream {
    receiver: mpsc::Receiver<Arc<str>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    guard: ConnectionGuard,
}

impl EventStream {
    pub(crate) fn new(receiver: mpsc::Receiver<Arc<str>>, guard: ConnectionGuard) -> Self {
        let cancelled = Box::pin(guard.handle.cancellation().cancelled_owned());
        Self {
            receiver,
            cancelled,
            guard,
        }
    }

    /// The teardown guard.
    pub fn guard(&self) -> &ConnectionGuard {
        &self.guard
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("connection_id", &self.guard.connection_id())
            .finish()
    }
}

impl Stream for EventStream {
    type Item = Arc<str>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}
