//! The change-event wire type.
//!
//! A change event is produced once per committed write (message insert,
//! update, delete, reaction toggle), delivered over the Postgres NOTIFY
//! channels, matched against live subscriptions, and then discarded. There
//! is no replay: a reconnecting client reconciles through the REST layer.
//!
//! The authorization hints (`channelIsPrivate`, `channelMemberIds`,
//! `participantIds`) exist only for the notification-subscriber matching
//! tier; direct-scope recipients simply ignore them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::id::{ChannelId, OrganizationId, SessionId, UserId};

/// The kind of write that produced a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A new message was created.
    Insert,
    /// An existing message was edited.
    Update,
    /// A message was deleted.
    Delete,
    /// A reaction was added or removed.
    Reaction,
}

/// A single change event as carried on the wire.
///
/// Exactly one of `channel_id` / `session_id` is set, depending on whether
/// the write touched a channel or a DM session. Deserialization rejects
/// unknown `type` tags, which is how malformed frames are detected at the
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// The kind of write.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Channel scope, for channel writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    /// DM session scope, for direct-message writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// The organization the write belongs to.
    pub organization_id: OrganizationId,
    /// Full message payload for inserts and updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    /// Message identifier for deletes and reactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    /// Whether the scoped channel is private. Authorization hint.
    #[serde(default)]
    pub channel_is_private: bool,
    /// Member ids of a private channel. Authorization hint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_member_ids: Vec<UserId>,
    /// Participant ids of a DM session. Authorization hint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant_ids: Vec<UserId>,
}

impl ChangeEvent {
    /// Parse a change event from a NOTIFY payload.
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
