//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Interval between heartbeat cycles in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// How long a subscription may go without a pong before it is reaped,
    /// in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
    /// How long without an activity signal before a connected user is shown
    /// as away, in seconds.
    #[serde(default = "default_away_timeout")]
    pub away_timeout_seconds: u64,
    /// Per-connection outbound frame buffer depth.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Postgres NOTIFY channels carrying change events.
    #[serde(default = "default_event_channels")]
    pub event_channels: Vec<String>,
    /// Initial retry delay for the change-event listener in milliseconds.
    #[serde(default = "default_listener_retry_initial")]
    pub listener_retry_initial_ms: u64,
    /// Maximum retry delay for the change-event listener in milliseconds.
    #[serde(default = "default_listener_retry_max")]
    pub listener_retry_max_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_seconds: default_ping_interval(),
            connection_timeout_seconds: default_connection_timeout(),
            away_timeout_seconds: default_away_timeout(),
            outbound_buffer_size: default_outbound_buffer(),
            event_channels: default_event_channels(),
            listener_retry_initial_ms: default_listener_retry_initial(),
            listener_retry_max_ms: default_listener_retry_max(),
        }
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_connection_timeout() -> u64 {
    90
}

fn default_away_timeout() -> u64 {
    300
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_event_channels() -> Vec<String> {
    vec!["channel_events".to_string(), "dm_events".to_string()]
}

fn default_listener_retry_initial() -> u64 {
    1000
}

fn default_listener_retry_max() -> u64 {
    30000
}
