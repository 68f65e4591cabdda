//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use tavern_core::types::{InitiativeId, UserId};
use tavern_entity::MessageType;

fn default_true() -> bool {
    true
}

fn default_initiative_expression() -> String {
    "1d20".to_string()
}

/// `POST /sessions`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 20, message = "maxPlayers must be between 1 and 20"))]
    pub max_players: Option<u32>,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

/// `GET /sessions` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSessionsQuery {
    /// Only publicly listed sessions.
    #[serde(default)]
    pub public: Option<bool>,
    /// Only sessions refereed by this user.
    #[serde(default)]
    pub dm_id: Option<UserId>,
}

/// `POST /sessions/join`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    #[validate(length(equal = 6, message = "Session key must be 6 characters"))]
    pub session_key: String,
    pub character_id: Option<String>,
    #[validate(length(max = 100))]
    pub character_name: Option<String>,
}

/// `POST /sessions/{id}/kick`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct KickRequest {
    pub target_user_id: UserId,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// `POST /sessions/{id}/assign-dm`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDmRequest {
    pub dm_user_id: UserId,
}

/// `POST /sessions/{id}/chat`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: MessageType,
    pub room_id: Option<String>,
}

/// `POST /sessions/{id}/chat-rooms`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRoomRequest {
    #[validate(length(min = 1, max = 50, message = "Room name must be 1-50 characters"))]
    pub name: String,
    #[validate(length(max = 200))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub allowed_users: Vec<UserId>,
}

/// `POST /sessions/{id}/mark-read`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub room_id: Option<String>,
    pub last_message_id: Option<String>,
}

/// `POST /sessions/{id}/roll`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RollRequest {
    #[validate(length(min = 1, max = 100, message = "Expression must be 1-100 characters"))]
    pub expression: String,
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub room_id: Option<String>,
}

/// `POST /sessions/{id}/initiative`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddInitiativeRequest {
    #[validate(length(min = 1, max = 100, message = "Character name is required"))]
    pub character_name: String,
    #[serde(default = "default_initiative_expression")]
    #[validate(length(min = 1, max = 100))]
    pub expression: String,
}

/// Body of toggle-dead, and query of `DELETE /sessions/{id}/initiative`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeEntryRequest {
    pub entry_id: InitiativeId,
}

/// `POST /sessions/{id}/webrtc`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WebrtcSignalRequest {
    #[validate(length(min = 1, max = 50))]
    pub signal_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub target_user_id: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_defaults() {
        let req: CreateSessionRequest =
            serde_json::from_str(r#"{"title":"Keep"}"#).expect("decode");
        assert!(req.is_public);
        assert!(req.max_players.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_max_players_range() {
        let req: CreateSessionRequest =
            serde_json::from_str(r#"{"title":"Keep","maxPlayers":21}"#).expect("decode");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_chat_type_defaults_to_chat() {
        let req: SendMessageRequest =
            serde_json::from_str(r#"{"message":"hi","roomId":"general"}"#).expect("decode");
        assert_eq!(req.kind, MessageType::Chat);
    }

    #[test]
    fn test_initiative_expression_defaults_to_d20() {
        let req: AddInitiativeRequest =
            serde_json::from_str(r#"{"characterName":"Aria"}"#).expect("decode");
        assert_eq!(req.expression, "1d20");
    }
}
