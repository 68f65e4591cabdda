//! Chat rooms and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tavern_core::types::UserId;

/// Id of the room every session starts with.
pub const GENERAL_ROOM_ID: &str = "general";

/// Resolve the room a message belongs to.
///
/// Applied once when a message is ingested, so every stored message
/// carries an explicit room id.
pub fn normalize_room_id(room_id: Option<&str>) -> String {
    match room_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => GENERAL_ROOM_ID.to_string(),
    }
}

/// Kind of chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Typed by a participant.
    #[default]
    Chat,
    /// A dice roll result.
    Roll,
    /// Generated by the server (joins, kicks, DM changes).
    System,
}

/// A single chat message. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id, unique within the session.
    pub id: String,
    /// Author, `None` for system messages.
    pub user_id: Option<UserId>,
    /// Author display name.
    pub username: String,
    /// Message body.
    pub message: String,
    /// When the message was accepted.
    pub timestamp: DateTime<Utc>,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Room the message was posted to.
    pub room_id: String,
}

impl ChatMessage {
    /// Build a message authored by a user.
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        message: impl Into<String>,
        kind: MessageType,
        room_id: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: message_id(now),
            user_id: Some(user_id),
            username: username.into(),
            message: message.into(),
            timestamp: now,
            kind,
            room_id: normalize_room_id(room_id),
        }
    }

    /// Build a server-generated message.
    pub fn system(message: impl Into<String>, room_id: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: message_id(now),
            user_id: None,
            username: "System".to_string(),
            message: message.into(),
            timestamp: now,
            kind: MessageType::System,
            room_id: normalize_room_id(room_id),
        }
    }
}

fn message_id(now: DateTime<Utc>) -> String {
    format!("msg_{}_{}", now.timestamp_millis(), Uuid::new_v4().simple())
}

/// A chat room inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    /// Room id (`general` for the default room).
    pub id: String,
    /// Display name, unique per session ignoring case.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether this is the session's default room.
    pub is_default: bool,
    /// Whether only `allowed_users` (and the creator) may see the room.
    pub is_private: bool,
    /// Members of a private room.
    #[serde(default)]
    pub allowed_users: Vec<UserId>,
    /// Creator of the room, `None` for the default room.
    pub created_by: Option<UserId>,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    /// The default `general` room.
    pub fn general() -> Self {
        Self {
            id: GENERAL_ROOM_ID.to_string(),
            name: "General".to_string(),
            description: Some("Main session chat".to_string()),
            is_default: true,
            is_private: false,
            allowed_users: Vec::new(),
            created_by: None,
            created_at: Utc::now(),
        }
    }

    /// A new user-created room.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        is_private: bool,
        allowed_users: Vec<UserId>,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("room_{}_{}", now.timestamp_millis(), &suffix[..8]),
            name: name.into(),
            description,
            is_default: false,
            is_private,
            allowed_users,
            created_by: Some(created_by),
            created_at: now,
        }
    }

    /// Whether `user` may read and post in this room.
    pub fn is_visible_to(&self, user: UserId, is_creator: bool) -> bool {
        !self.is_private || is_creator || self.allowed_users.contains(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_room_id_defaults_to_general() {
        assert_eq!(normalize_room_id(None), GENERAL_ROOM_ID);
        assert_eq!(normalize_room_id(Some("")), GENERAL_ROOM_ID);
        assert_eq!(normalize_room_id(Some("   ")), GENERAL_ROOM_ID);
        assert_eq!(normalize_room_id(Some("room_1")), "room_1");
    }

    #[test]
    fn test_message_serializes_type_and_room() {
        let msg = ChatMessage::new(UserId::new(), "alice", "hello", MessageType::Chat, None);
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "chat");
        assert_eq!(json["roomId"], "general");
        assert!(json["id"].as_str().is_some_and(|id| id.starts_with("msg_")));
    }

    #[test]
    fn test_private_room_visibility() {
        let owner = UserId::new();
        let member = UserId::new();
        let outsider = UserId::new();
        let room = ChatRoom::new("Secrets", None, true, vec![member], owner);

        assert!(room.is_visible_to(member, false));
        assert!(room.is_visible_to(owner, true));
        assert!(!room.is_visible_to(outsider, false));
        assert!(ChatRoom::general().is_visible_to(outsider, false));
    }
}
