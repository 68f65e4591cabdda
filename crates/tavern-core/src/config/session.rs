//! Game session rules.

use serde::{Deserialize, Serialize};

/// Rules applied when creating and mutating game sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `maxPlayers` used when a create request omits it.
    #[serde(default = "default_max_players")]
    pub default_max_players: u32,
    /// Attempts at generating a unique join key before giving up.
    #[serde(default = "default_key_attempts")]
    pub max_key_attempts: u32,
    /// Attempts at re-applying a mutation after a version conflict.
    #[serde(default = "default_mutation_retries")]
    pub max_mutation_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_max_players: default_max_players(),
            max_key_attempts: default_key_attempts(),
            max_mutation_retries: default_mutation_retries(),
        }
    }
}

fn default_max_players() -> u32 {
    6
}

fn default_key_attempts() -> u32 {
    10
}

fn default_mutation_retries() -> u32 {
    3
}
