//! Player membership record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tavern_core::types::UserId;

/// A participant's membership in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// The user behind this seat.
    pub user_id: UserId,
    /// Display name at join time.
    pub username: String,
    /// Character sheet id, if one was picked.
    #[serde(default)]
    pub character_id: Option<String>,
    /// Character name, if one was picked.
    #[serde(default)]
    pub character_name: Option<String>,
    /// When the player first joined.
    pub joined_at: DateTime<Utc>,
    /// Last reported presence.
    pub is_online: bool,
    /// Last time the player reported any status.
    pub last_seen: DateTime<Utc>,
    /// Room id to the last message id the player has acknowledged.
    #[serde(default)]
    pub room_last_seen: BTreeMap<String, String>,
}

impl Player {
    /// A freshly joined, online player.
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        character_id: Option<String>,
        character_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username: username.into(),
            character_id,
            character_name,
            joined_at: now,
            is_online: true,
            last_seen: now,
            room_last_seen: BTreeMap::new(),
        }
    }

    /// Record a presence report. Returns whether `is_online` changed.
    pub fn set_online(&mut self, is_online: bool) -> bool {
        let changed = self.is_online != is_online;
        self.is_online = is_online;
        self.last_seen = Utc::now();
        changed
    }
}
