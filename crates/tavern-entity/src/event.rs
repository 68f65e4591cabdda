//! Session event wire model.
//!
//! Every frame on a session's event stream is one JSON object tagged by
//! `type`. Field names are camelCase on the wire. Clients decode into
//! [`SessionEvent`] and `match` on it; a `type` this build does not know
//! about decodes to [`SessionEvent::Unknown`] so that older clients keep
//! working when the server learns new events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tavern_core::types::{SessionId, UserId};

use crate::session::{ChatMessage, ChatRoom, InitiativeEntry, SessionSnapshot};

/// One event pushed to session subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    /// First frame on every stream.
    Connected {
        session_id: SessionId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// Full session state.
    SessionUpdate {
        session: Box<SessionSnapshot>,
        timestamp: DateTime<Utc>,
    },
    /// A chat, roll or system message was posted.
    NewMessage {
        message: ChatMessage,
        timestamp: DateTime<Utc>,
    },
    /// Another client opened a stream for this session.
    ParticipantJoined {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// A stream for this session closed.
    ParticipantLeft {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// A player's reported presence changed.
    ParticipantStatusUpdate {
        user_id: UserId,
        is_online: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_status: Option<bool>,
        timestamp: DateTime<Utc>,
    },
    /// The initiative order or current turn changed.
    InitiativeUpdate {
        initiative_order: Vec<InitiativeEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_turn: Option<usize>,
        timestamp: DateTime<Utc>,
    },
    /// The room list changed.
    ChatRoomsUpdate {
        chat_rooms: Vec<ChatRoom>,
        timestamp: DateTime<Utc>,
    },
    /// A player acknowledged messages in a room.
    RoomReadUpdate {
        user_id: UserId,
        room_id: String,
        last_message_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Opaque WebRTC signaling payload relayed between peers.
    WebrtcSignal {
        signal_type: String,
        data: serde_json::Value,
        from_user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<UserId>,
        timestamp: DateTime<Utc>,
    },
    /// A player was removed by the creator.
    UserKicked {
        target_user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Any `type` not listed above.
    #[serde(other)]
    Unknown,
}

impl SessionEvent {
    /// `connected` acknowledgment.
    pub fn connected(session_id: SessionId, user_id: UserId) -> Self {
        Self::Connected {
            session_id,
            user_id,
            timestamp: Utc::now(),
        }
    }

    /// `session_update` snapshot.
    pub fn session_update(snapshot: SessionSnapshot) -> Self {
        Self::SessionUpdate {
            session: Box::new(snapshot),
            timestamp: Utc::now(),
        }
    }

    /// `new_message`.
    pub fn new_message(message: ChatMessage) -> Self {
        Self::NewMessage {
            message,
            timestamp: Utc::now(),
        }
    }

    /// `participant_joined`.
    pub fn participant_joined(user_id: UserId) -> Self {
        Self::ParticipantJoined {
            user_id,
            timestamp: Utc::now(),
        }
    }

    /// `participant_left`.
    pub fn participant_left(user_id: UserId) -> Self {
        Self::ParticipantLeft {
            user_id,
            timestamp: Utc::now(),
        }
    }

    /// `participant_status_update`.
    pub fn status_update(user_id: UserId, is_online: bool, previous_status: Option<bool>) -> Self {
        Self::ParticipantStatusUpdate {
            user_id,
            is_online,
            previous_status,
            timestamp: Utc::now(),
        }
    }

    /// `initiative_update`.
    pub fn initiative_update(
        initiative_order: Vec<InitiativeEntry>,
        current_turn: Option<usize>,
    ) -> Self {
        Self::InitiativeUpdate {
            initiative_order,
            current_turn,
            timestamp: Utc::now(),
        }
    }

    /// `chat_rooms_update`.
    pub fn chat_rooms_update(chat_rooms: Vec<ChatRoom>) -> Self {
        Self::ChatRoomsUpdate {
            chat_rooms,
            timestamp: Utc::now(),
        }
    }

    /// `room_read_update`.
    pub fn room_read_update(
        user_id: UserId,
        room_id: impl Into<String>,
        last_message_id: impl Into<String>,
    ) -> Self {
        Self::RoomReadUpdate {
            user_id,
            room_id: room_id.into(),
            last_message_id: last_message_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// `webrtc_signal`.
    pub fn webrtc_signal(
        signal_type: impl Into<String>,
        data: serde_json::Value,
        from_user_id: UserId,
        target_user_id: Option<UserId>,
    ) -> Self {
        Self::WebrtcSignal {
            signal_type: signal_type.into(),
            data,
            from_user_id,
            target_user_id,
            timestamp: Utc::now(),
        }
    }

    /// `user_kicked`.
    pub fn user_kicked(target_user_id: UserId, reason: Option<String>) -> Self {
        Self::UserKicked {
            target_user_id,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Wire name of the event, for logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::SessionUpdate { .. } => "session_update",
            Self::NewMessage { .. } => "new_message",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantLeft { .. } => "participant_left",
            Self::ParticipantStatusUpdate { .. } => "participant_status_update",
            Self::InitiativeUpdate { .. } => "initiative_update",
            Self::ChatRoomsUpdate { .. } => "chat_rooms_update",
            Self::RoomReadUpdate { .. } => "room_read_update",
            Self::WebrtcSignal { .. } => "webrtc_signal",
            Self::UserKicked { .. } => "user_kicked",
            Self::Unknown => "unknown",
        }
    }
}
