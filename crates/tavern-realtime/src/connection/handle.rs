//! Individual event stream connection handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tavern_core::types::{ConnectionId, SessionId, UserId};

/// Why a frame could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The client is not draining its buffer.
    #[error("send buffer full")]
    Full,
    /// The stream side is gone.
    #[error("connection closed")]
    Closed,
}

/// A handle to a single open event stream.
///
/// Holds the sender half of the connection's outbound buffer plus the
/// token that ends the stream when cancelled.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Session the stream is subscribed to
    pub session_id: SessionId,
    /// User who opened the stream
    pub user_id: UserId,
    /// Username (cached for logs)
    pub username: String,
    /// When the stream was opened
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Arc<str>>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(
        session_id: SessionId,
        user_id: UserId,
        username: impl Into<String>,
        sender: mpsc::Sender<Arc<str>>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            session_id,
            user_id,
            username: username.into(),
            connected_at: Utc::now(),
            sender,
            cancel: CancellationToken::new(),
        }
    }

    /// Queue a serialized frame without waiting.
    pub fn try_send(&self, frame: Arc<str>) -> Result<(), SendError> {
        if self.cancel.is_cancelled() {
            return Err(SendError::Closed);
        }
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// End the stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the stream has been told to end.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observed by the stream side.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
