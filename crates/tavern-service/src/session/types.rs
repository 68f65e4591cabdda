//! Inputs and outcomes of session operations.

use serde::{Deserialize, Serialize};

use tavern_core::types::UserId;
use tavern_entity::Session;

/// Parameters for a new session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub title: String,
    pub description: Option<String>,
    /// Falls back to `session.default_max_players`.
    pub max_players: Option<u32>,
    pub is_public: bool,
}

/// Character picked when joining.
#[derive(Debug, Clone, Default)]
pub struct CharacterChoice {
    pub character_id: Option<String>,
    pub character_name: Option<String>,
}

/// Parameters for a new chat room.
#[derive(Debug, Clone, Default)]
pub struct NewChatRoom {
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub allowed_users: Vec<UserId>,
}

/// How the caller takes part in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Dm,
    Player,
}

/// Result of a join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub session: Session,
    pub role: ParticipantRole,
    /// `false` when the caller already held a seat (or is the DM).
    pub newly_joined: bool,
}

/// Result of leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// The session was deactivated because nobody was left to own it.
    pub session_ended: bool,
}

/// Result of a presence report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub changed: bool,
    pub is_online: bool,
    pub previous_status: bool,
}
