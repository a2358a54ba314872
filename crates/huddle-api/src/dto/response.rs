//! Standard response envelopes.

use std::collections::HashMap;

use serde::Serialize;

use huddle_core::types::id::{OrganizationId, UserId};
use huddle_realtime::presence::status::PresenceStatus;

/// Generic success envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// The payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload.
    pub fn ok(data: T) -> Self {
        Self { data }
    }
}

/// Basic health payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process is serving.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Detailed health payload with realtime gauges.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// `"connected"` or `"unreachable"`.
    pub database: String,
    /// Live WebSocket subscriptions.
    pub ws_connections: usize,
}

/// Presence snapshot payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    /// The organization queried.
    pub organization_id: OrganizationId,
    /// User → derived status; absent users are offline.
    pub presence: HashMap<UserId, PresenceStatus>,
}
