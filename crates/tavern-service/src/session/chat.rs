//! Chat, rooms, read tracking and dice rolls posted to chat.

use std::collections::BTreeMap;

use tracing::{debug, info};

use tavern_core::error::AppError;
use tavern_core::result::AppResult;
use tavern_core::types::SessionId;
use tavern_entity::session::{GENERAL_ROOM_ID, normalize_room_id};
use tavern_entity::{ChatMessage, ChatRoom, MessageType, SessionEvent};

use crate::context::RequestContext;
use crate::dice::{self, DiceRoll};

use super::service::{
    SessionService, display_name, require_creator, require_participant, require_room,
};
use super::types::NewChatRoom;

impl SessionService {
    /// Post a chat message.
    pub async fn send_chat(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        message: &str,
        kind: MessageType,
        room_id: Option<&str>,
    ) -> AppResult<ChatMessage> {
        let body = message.trim();
        if body.is_empty() {
            return Err(AppError::validation("Message cannot be empty"));
        }
        if kind == MessageType::System {
            return Err(AppError::validation("System messages cannot be posted"));
        }

        self.post(ctx, id, body, kind, room_id).await
    }

    /// Roll dice and post the result to chat.
    pub async fn roll_dice(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        expression: &str,
        label: Option<&str>,
        room_id: Option<&str>,
    ) -> AppResult<(DiceRoll, ChatMessage)> {
        let roll = dice::evaluate(expression)?;

        let text = match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => format!("🎲 {label}: {}", roll.breakdown),
            None => format!("🎲 {}", roll.breakdown),
        };
        let message = self.post(ctx, id, &text, MessageType::Roll, room_id).await?;

        debug!(session_id = %id, total = roll.total, "Dice rolled");
        Ok((roll, message))
    }

    async fn post(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        body: &str,
        kind: MessageType,
        room_id: Option<&str>,
    ) -> AppResult<ChatMessage> {
        let room = normalize_room_id(room_id);

        let (session, message) = self
            .mutate(id, |session| {
                require_participant(session, ctx)?;
                require_room(session, &room, ctx)?;

                let message = ChatMessage::new(
                    ctx.user_id,
                    display_name(session, ctx),
                    body,
                    kind,
                    Some(&room),
                );
                session.push_message(message.clone());
                Ok(message)
            })
            .await?;

        self.publish(&session, SessionEvent::new_message(message.clone()));
        Ok(message)
    }

    /// Rooms visible to the caller.
    pub async fn list_chat_rooms(
        &self,
        ctx: &RequestContext,
        id: SessionId,
    ) -> AppResult<Vec<ChatRoom>> {
        let session = self.load(id).await?;
        require_participant(&session, ctx)?;
        Ok(session.visible_rooms(ctx.user_id))
    }

    /// Create a room. Creator only; names are unique ignoring case.
    pub async fn create_chat_room(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        input: NewChatRoom,
    ) -> AppResult<ChatRoom> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Room name is required"));
        }
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let (session, (room, notice)) = self
            .mutate(id, |session| {
                require_creator(session, ctx, "create chat rooms")?;
                if session.has_room_named(name) {
                    return Err(AppError::validation("A room with this name already exists"));
                }

                let room = ChatRoom::new(
                    name,
                    description.clone(),
                    input.is_private,
                    input.allowed_users.clone(),
                    ctx.user_id,
                );
                let notice = ChatMessage::system(
                    format!("{} created chat room \"{name}\"", session.creator_name),
                    Some(GENERAL_ROOM_ID),
                );
                session.chat_rooms.push(room.clone());
                session.push_message(notice.clone());
                Ok((room, notice))
            })
            .await?;

        info!(session_id = %id, room_id = %room.id, private = room.is_private, "Chat room created");

        self.publish(
            &session,
            SessionEvent::chat_rooms_update(session.chat_rooms.clone()),
        );
        self.publish(&session, SessionEvent::new_message(notice));
        Ok(room)
    }

    /// Record that the caller has read `room_id` up to `last_message_id`
    /// (or the newest message in the room). Returns the acknowledged id,
    /// or `None` if the room is empty.
    pub async fn mark_read(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        room_id: Option<&str>,
        last_message_id: Option<String>,
    ) -> AppResult<Option<String>> {
        let room = normalize_room_id(room_id);

        let (session, acknowledged) = self
            .mutate(id, |session| {
                require_participant(session, ctx)?;
                require_room(session, &room, ctx)?;

                let acknowledged = match &last_message_id {
                    Some(wanted) => {
                        let known = session
                            .chat_messages
                            .iter()
                            .any(|m| &m.id == wanted && m.room_id == room);
                        if !known {
                            return Err(AppError::not_found("Message not found in room"));
                        }
                        Some(wanted.clone())
                    }
                    None => session.latest_message_id(&room).map(str::to_string),
                };

                if let Some(message_id) = &acknowledged {
                    session.record_read(ctx.user_id, &room, message_id);
                }
                Ok(acknowledged)
            })
            .await?;

        if let Some(message_id) = &acknowledged {
            self.publish(
                &session,
                SessionEvent::room_read_update(ctx.user_id, room.as_str(), message_id.as_str()),
            );
        }
        Ok(acknowledged)
    }

    /// Unread message counts per visible room.
    pub async fn unread_counts(
        &self,
        ctx: &RequestContext,
        id: SessionId,
    ) -> AppResult<BTreeMap<String, usize>> {
        let session = self.load(id).await?;
        require_participant(&session, ctx)?;
        Ok(session.unread_counts(ctx.user_id))
    }
}
