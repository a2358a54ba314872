//! Presence status definitions.

use serde::{Deserialize, Serialize};

/// Derived user presence status.
///
/// Never stored: computed from connection count and last activity at read
/// time. A user with zero connections is simply absent from the online set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Connected and recently active.
    Online,
    /// Connected but silent past the away timeout.
    Away,
    /// No live connections.
    Offline,
}

impl PresenceStatus {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
