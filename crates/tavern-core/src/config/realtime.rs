//! Event stream configuration.

use serde::{Deserialize, Serialize};

/// Server-Sent Events engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-connection outbound buffer. A connection whose buffer is full
    /// is treated as dead and evicted.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Interval between SSE keep-alive comments, in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
    /// Number of chat messages included in the connect-time snapshot.
    #[serde(default = "default_snapshot_messages")]
    pub snapshot_message_limit: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            keep_alive_seconds: default_keep_alive(),
            snapshot_message_limit: default_snapshot_messages(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_keep_alive() -> u64 {
    15
}

fn default_snapshot_messages() -> usize {
    50
}
