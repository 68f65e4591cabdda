//! Session aggregate root.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tavern_core::types::{InitiativeId, SessionId, UserId};

use super::chat::{ChatMessage, ChatRoom};
use super::initiative::InitiativeEntry;
use super::player::Player;

/// An in-progress game.
///
/// The whole aggregate is read and written as one document. `version`
/// is bumped by the store on every successful write and checked on the
/// next one, which is how concurrent mutations are serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Server-assigned id.
    pub id: SessionId,
    /// Display title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Six-character uppercase join key.
    pub session_key: String,
    /// Owner of the session.
    pub creator_id: UserId,
    /// Owner display name.
    pub creator_name: String,
    /// Assigned game master, if any.
    pub dm_id: Option<UserId>,
    /// Game master display name.
    pub dm_name: Option<String>,
    /// Seated players.
    #[serde(default)]
    pub players: Vec<Player>,
    /// Seat cap.
    pub max_players: u32,
    /// False once the session has been abandoned.
    pub is_active: bool,
    /// Whether the session shows up in public listings.
    pub is_public: bool,
    /// Append-only chat log across all rooms.
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
    /// Chat rooms; always contains `general`.
    #[serde(default)]
    pub chat_rooms: Vec<ChatRoom>,
    /// Initiative order, highest first.
    #[serde(default)]
    pub initiative_order: Vec<InitiativeEntry>,
    /// Index into `initiative_order` of the acting combatant.
    #[serde(default)]
    pub current_turn: Option<usize>,
    /// Read state of the DM and creator while they hold no seat.
    #[serde(default)]
    pub referee_last_seen: BTreeMap<UserId, BTreeMap<String, String>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    #[serde(default)]
    pub version: u64,
}

impl Session {
    /// Create a session owned (and refereed) by `creator_id`.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        session_key: impl Into<String>,
        creator_id: UserId,
        creator_name: impl Into<String>,
        max_players: u32,
        is_public: bool,
    ) -> Self {
        let now = Utc::now();
        let creator_name = creator_name.into();
        Self {
            id: SessionId::new(),
            title: title.into(),
            description: description.into(),
            session_key: session_key.into().to_uppercase(),
            creator_id,
            creator_name: creator_name.clone(),
            dm_id: Some(creator_id),
            dm_name: Some(creator_name),
            players: Vec::new(),
            max_players,
            is_active: true,
            is_public,
            chat_messages: Vec::new(),
            chat_rooms: vec![ChatRoom::general()],
            initiative_order: Vec::new(),
            current_turn: None,
            referee_last_seen: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Stamp `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The player record for `user`, if seated.
    pub fn player(&self, user: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user)
    }

    /// Mutable player record for `user`, if seated.
    pub fn player_mut(&mut self, user: UserId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.user_id == user)
    }

    /// Remove and return the player record for `user`.
    pub fn remove_player(&mut self, user: UserId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.user_id == user)?;
        Some(self.players.remove(index))
    }

    /// Whether `user` owns the session.
    pub fn is_creator(&self, user: UserId) -> bool {
        self.creator_id == user
    }

    /// Whether `user` is the assigned game master.
    pub fn is_dm(&self, user: UserId) -> bool {
        self.dm_id == Some(user)
    }

    /// Players, the DM and the creator all count as participants.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.is_creator(user) || self.is_dm(user) || self.player(user).is_some()
    }

    /// DM-level actions (combat management) are open to the DM and the creator.
    pub fn can_referee(&self, user: UserId) -> bool {
        self.is_creator(user) || self.is_dm(user)
    }

    /// Whether every seat is taken.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    /// Clear the DM seat.
    pub fn clear_dm(&mut self) {
        self.dm_id = None;
        self.dm_name = None;
    }

    /// Look up a room by id.
    pub fn room(&self, room_id: &str) -> Option<&ChatRoom> {
        self.chat_rooms.iter().find(|r| r.id == room_id)
    }

    /// Whether a room with this name exists, ignoring case.
    pub fn has_room_named(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        self.chat_rooms
            .iter()
            .any(|r| r.name.to_lowercase() == wanted)
    }

    /// Rooms `user` may see.
    pub fn visible_rooms(&self, user: UserId) -> Vec<ChatRoom> {
        let is_creator = self.is_creator(user);
        self.chat_rooms
            .iter()
            .filter(|r| r.is_visible_to(user, is_creator))
            .cloned()
            .collect()
    }

    /// Append a message to the log.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.chat_messages.push(message);
    }

    /// Id of the newest message in `room_id`.
    pub fn latest_message_id(&self, room_id: &str) -> Option<&str> {
        self.chat_messages
            .iter()
            .rev()
            .find(|m| m.room_id == room_id)
            .map(|m| m.id.as_str())
    }

    /// Room id to last acknowledged message id for `user`, seated or not.
    pub fn read_state(&self, user: UserId) -> Option<&BTreeMap<String, String>> {
        match self.player(user) {
            Some(player) => Some(&player.room_last_seen),
            None => self.referee_last_seen.get(&user),
        }
    }

    /// Record that `user` has read `room_id` up to `message_id`.
    ///
    /// Seated players keep the marker on their seat; the DM and creator
    /// keep it on the session. Returns false for anyone else.
    pub fn record_read(&mut self, user: UserId, room_id: &str, message_id: &str) -> bool {
        let seen = if let Some(player) = self.player_mut(user) {
            &mut player.room_last_seen
        } else if self.can_referee(user) {
            self.referee_last_seen.entry(user).or_default()
        } else {
            return false;
        };
        seen.insert(room_id.to_string(), message_id.to_string());
        true
    }

    /// Per visible room, how many messages by others arrived after the
    /// user's acknowledged message.
    pub fn unread_counts(&self, user: UserId) -> BTreeMap<String, usize> {
        let acknowledged = self.read_state(user);

        self.visible_rooms(user)
            .into_iter()
            .map(|room| {
                let in_room: Vec<&ChatMessage> = self
                    .chat_messages
                    .iter()
                    .filter(|m| m.room_id == room.id)
                    .collect();

                let start = acknowledged
                    .and_then(|seen| seen.get(&room.id))
                    .and_then(|last| in_room.iter().position(|m| &m.id == last))
                    .map_or(0, |pos| pos + 1);

                let unread = in_room[start..]
                    .iter()
                    .filter(|m| m.user_id != Some(user))
                    .count();

                (room.id, unread)
            })
            .collect()
    }

    /// Add an initiative roll, replacing any earlier roll for the same
    /// (character, owner) pair, and keep the order sorted.
    pub fn upsert_initiative(&mut self, entry: InitiativeEntry) {
        let acting = self.acting_entry_id();
        self.initiative_order.retain(|e| !e.same_combatant(&entry));
        self.initiative_order.push(entry);
        self.sort_initiative(acting);
    }

    /// Remove one entry by id.
    pub fn remove_initiative(&mut self, id: InitiativeId) -> Option<InitiativeEntry> {
        let acting = self.acting_entry_id();
        let index = self.initiative_order.iter().position(|e| e.id == id)?;
        let removed = self.initiative_order.remove(index);
        self.sort_initiative(acting);
        Some(removed)
    }

    /// Remove every entry owned by `user`.
    pub fn remove_initiative_for(&mut self, user: UserId) {
        let acting = self.acting_entry_id();
        self.initiative_order.retain(|e| e.user_id != user);
        self.sort_initiative(acting);
    }

    /// Look up an entry by id.
    pub fn initiative_entry_mut(&mut self, id: InitiativeId) -> Option<&mut InitiativeEntry> {
        self.initiative_order.iter_mut().find(|e| e.id == id)
    }

    /// Move `current_turn` to the next living combatant, wrapping around.
    /// Returns the new index, or `None` if nobody can act.
    pub fn advance_turn(&mut self) -> Option<usize> {
        let len = self.initiative_order.len();
        let start = self.current_turn.map_or(0, |t| t + 1);

        self.current_turn = (0..len)
            .map(|offset| (start + offset) % len.max(1))
            .find(|&i| !self.initiative_order[i].is_dead);
        self.current_turn
    }

    fn acting_entry_id(&self) -> Option<InitiativeId> {
        self.current_turn
            .and_then(|t| self.initiative_order.get(t))
            .map(|e| e.id)
    }

    // `sort_by` is stable, so ties keep insertion order.
    fn sort_initiative(&mut self, acting: Option<InitiativeId>) {
        self.initiative_order
            .sort_by(|a, b| b.initiative.cmp(&a.initiative));

        let previous = self.current_turn;
        self.current_turn = match acting {
            Some(id) => self
                .initiative_order
                .iter()
                .position(|e| e.id == id)
                .or_else(|| previous.filter(|&t| t < self.initiative_order.len())),
            None => None,
        };
    }

    /// Client-facing view with the chat log trimmed to the newest
    /// `message_limit` messages.
    pub fn snapshot(&self, message_limit: usize) -> SessionSnapshot {
        let skip = self.chat_messages.len().saturating_sub(message_limit);
        SessionSnapshot {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            session_key: self.session_key.clone(),
            creator_id: self.creator_id,
            creator_name: self.creator_name.clone(),
            dm_id: self.dm_id,
            dm_name: self.dm_name.clone(),
            players: self.players.clone(),
            max_players: self.max_players,
            is_active: self.is_active,
            is_public: self.is_public,
            chat_messages: self.chat_messages[skip..].to_vec(),
            chat_rooms: self.chat_rooms.clone(),
            initiative_order: self.initiative_order.clone(),
            current_turn: self.current_turn,
        }
    }

    /// Listing row.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            session_key: self.session_key.clone(),
            creator_name: self.creator_name.clone(),
            dm_name: self.dm_name.clone(),
            max_players: self.max_players,
            player_count: self.players.len(),
            is_public: self.is_public,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// The session as pushed in `session_update` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub title: String,
    pub description: String,
    pub session_key: String,
    pub creator_id: UserId,
    pub creator_name: String,
    pub dm_id: Option<UserId>,
    pub dm_name: Option<String>,
    pub players: Vec<Player>,
    pub max_players: u32,
    pub is_active: bool,
    pub is_public: bool,
    pub chat_messages: Vec<ChatMessage>,
    pub chat_rooms: Vec<ChatRoom>,
    pub initiative_order: Vec<InitiativeEntry>,
    #[serde(default)]
    pub current_turn: Option<usize>,
}

/// One row of a session listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub description: String,
    pub session_key: String,
    pub creator_name: String,
    pub dm_name: Option<String>,
    pub max_players: u32,
    pub player_count: usize,
    pub is_public: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::chat::MessageType;

    fn session() -> Session {
        Session::new("Lost Mine", "", "abc123", UserId::new(), "dm", 4, true)
    }

    fn roll(session: &mut Session, name: &str, user: UserId, value: i64) -> InitiativeId {
        let entry = InitiativeEntry::new(name, value, format!("1d20[{value}] = {value}"), user, "u");
        let id = entry.id;
        session.upsert_initiative(entry);
        id
    }

    #[test]
    fn test_new_session_defaults() {
        let s = session();
        assert_eq!(s.session_key, "ABC123");
        assert!(s.is_dm(s.creator_id));
        assert_eq!(s.chat_rooms.len(), 1);
        assert_eq!(s.chat_rooms[0].id, "general");
        assert!(s.is_participant(s.creator_id));
    }

    #[test]
    fn test_initiative_ties_keep_insertion_order() {
        let mut s = session();
        let user = UserId::new();
        roll(&mut s, "Ten", user, 10);
        let first = roll(&mut s, "EighteenA", user, 18);
        let second = roll(&mut s, "EighteenB", user, 18);
        roll(&mut s, "Five", user, 5);

        let order: Vec<i64> = s.initiative_order.iter().map(|e| e.initiative).collect();
        assert_eq!(order, vec![18, 18, 10, 5]);
        assert_eq!(s.initiative_order[0].id, first);
        assert_eq!(s.initiative_order[1].id, second);
    }

    #[test]
    fn test_reroll_replaces_same_character() {
        let mut s = session();
        let user1 = UserId::new();
        roll(&mut s, "Aragorn", user1, 7);
        roll(&mut s, "Aragorn", user1, 15);
        roll(&mut s, "Aragorn", UserId::new(), 3);

        let aragorn_user1: Vec<_> = s
            .initiative_order
            .iter()
            .filter(|e| e.character_name == "Aragorn" && e.user_id == user1)
            .collect();
        assert_eq!(aragorn_user1.len(), 1);
        assert_eq!(aragorn_user1[0].initiative, 15);
        assert_eq!(s.initiative_order.len(), 2);
    }

    #[test]
    fn test_advance_turn_skips_dead_and_wraps() {
        let mut s = session();
        let user = UserId::new();
        roll(&mut s, "A", user, 20);
        let b = roll(&mut s, "B", user, 15);
        roll(&mut s, "C", user, 10);

        if let Some(entry) = s.initiative_entry_mut(b) {
            entry.is_dead = true;
        }

        assert_eq!(s.advance_turn(), Some(0));
        assert_eq!(s.advance_turn(), Some(2));
        assert_eq!(s.advance_turn(), Some(0));
    }

    #[test]
    fn test_turn_follows_acting_entry_after_resort() {
        let mut s = session();
        let user = UserId::new();
        let a = roll(&mut s, "A", user, 10);
        s.advance_turn();
        roll(&mut s, "B", user, 19);

        assert_eq!(s.current_turn, Some(1));
        assert_eq!(s.initiative_order[1].id, a);
    }

    #[test]
    fn test_advance_turn_on_empty_order() {
        let mut s = session();
        assert_eq!(s.advance_turn(), None);
    }

    #[test]
    fn test_unread_counts_skip_own_and_acknowledged() {
        let mut s = session();
        let me = UserId::new();
        let other = UserId::new();
        s.players.push(Player::new(me, "me", None, None));

        let first = ChatMessage::new(other, "other", "one", MessageType::Chat, None);
        let first_id = first.id.clone();
        s.push_message(first);
        s.push_message(ChatMessage::new(me, "me", "mine", MessageType::Chat, None));
        s.push_message(ChatMessage::new(other, "other", "two", MessageType::Chat, None));

        assert_eq!(s.unread_counts(me).get("general"), Some(&2));

        if let Some(player) = s.player_mut(me) {
            player.room_last_seen.insert("general".to_string(), first_id);
        }
        assert_eq!(s.unread_counts(me).get("general"), Some(&1));
    }

    #[test]
    fn test_unseated_referee_keeps_read_state() {
        let mut s = session();
        let other = UserId::new();
        let message = ChatMessage::new(other, "other", "hail", MessageType::Chat, None);
        let message_id = message.id.clone();
        s.push_message(message);

        let creator = s.creator_id;
        assert_eq!(s.unread_counts(creator).get("general"), Some(&1));
        assert!(s.record_read(creator, "general", &message_id));
        assert_eq!(s.unread_counts(creator).get("general"), Some(&0));
        assert!(s.player(creator).is_none());

        assert!(!s.record_read(UserId::new(), "general", &message_id));
    }

    #[test]
    fn test_snapshot_trims_chat_history() {
        let mut s = session();
        for i in 0..60 {
            s.push_message(ChatMessage::system(format!("m{i}"), None));
        }
        let snap = s.snapshot(50);
        assert_eq!(snap.chat_messages.len(), 50);
        assert_eq!(snap.chat_messages[0].message, "m10");
    }

    #[test]
    fn test_room_name_collision_ignores_case() {
        let s = session();
        assert!(s.has_room_named("GENERAL"));
        assert!(!s.has_room_named("Tavern"));
    }
}
