//! Initiative tracker entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tavern_core::types::{InitiativeId, UserId};

/// One combatant in the initiative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeEntry {
    /// Entry id.
    pub id: InitiativeId,
    /// Character the roll was made for.
    pub character_name: String,
    /// Rolled total.
    pub initiative: i64,
    /// Human-readable breakdown of the roll.
    pub roll_details: String,
    /// Owner of the entry.
    pub user_id: UserId,
    /// Owner display name.
    pub user_name: String,
    /// Whether the entry takes part in the current encounter.
    pub is_active: bool,
    /// Dead combatants stay in the order but are skipped.
    pub is_dead: bool,
    /// When the entry was rolled.
    pub added_at: DateTime<Utc>,
}

impl InitiativeEntry {
    /// A new, living entry.
    pub fn new(
        character_name: impl Into<String>,
        initiative: i64,
        roll_details: impl Into<String>,
        user_id: UserId,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            id: InitiativeId::new(),
            character_name: character_name.into(),
            initiative,
            roll_details: roll_details.into(),
            user_id,
            user_name: user_name.into(),
            is_active: true,
            is_dead: false,
            added_at: Utc::now(),
        }
    }

    /// Whether this entry is for the same character of the same owner.
    pub fn same_combatant(&self, other: &InitiativeEntry) -> bool {
        self.user_id == other.user_id && self.character_name == other.character_name
    }
}
