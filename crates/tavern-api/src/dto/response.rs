//! Response DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tavern_entity::{ChatMessage, InitiativeEntry, Session};
use tavern_realtime::MetricsSnapshot;
use tavern_service::dice::DiceRoll;
use tavern_service::session::ParticipantRole;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Sessions with at least one open stream.
    pub live_sessions: usize,
    pub realtime: MetricsSnapshot,
}

/// Result of joining a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub session: Session,
    pub role: ParticipantRole,
    pub newly_joined: bool,
}

/// Result of leaving a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub message: String,
    pub session_ended: bool,
}

/// A dice roll and the chat message it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResponse {
    pub roll: DiceRoll,
    pub message: ChatMessage,
}

/// A new initiative entry and the roll behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeResponse {
    pub entry: InitiativeEntry,
    pub roll: DiceRoll,
}

/// Current turn after advancing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub current_turn: Option<usize>,
}

/// Acknowledged read position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub room_id: String,
    pub last_message_id: Option<String>,
}

/// Unread counts keyed by room id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadResponse {
    pub unread_counts: BTreeMap<String, usize>,
}
