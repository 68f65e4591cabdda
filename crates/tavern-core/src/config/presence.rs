//! Presence heuristics shared by the client tracker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Heartbeat and inactivity settings.
///
/// This is the single source of truth for "is a player online"; nothing
/// else in the system computes staleness on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Period of the heartbeat timer, in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Inactivity after which the user is considered offline, in seconds.
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold_seconds: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval(),
            inactivity_threshold_seconds: default_inactivity_threshold(),
        }
    }
}

impl PresenceConfig {
    /// Heartbeat period.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Inactivity threshold.
    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_seconds)
    }

    /// The threshold must leave at least one full heartbeat of grace.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.heartbeat_interval_seconds == 0 {
            return Err(AppError::configuration(
                "presence.heartbeat_interval_seconds must be positive",
            ));
        }
        if self.inactivity_threshold_seconds <= self.heartbeat_interval_seconds {
            return Err(AppError::configuration(
                "presence.inactivity_threshold_seconds must exceed the heartbeat interval",
            ));
        }
        Ok(())
    }
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_inactivity_threshold() -> u64 {
    5 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_must_exceed_interval() {
        let config = PresenceConfig {
            heartbeat_interval_seconds: 30,
            inactivity_threshold_seconds: 30,
        };
        assert!(config.validate().is_err());
        assert!(PresenceConfig::default().validate().is_ok());
    }
}
