//! Inbound and outbound WebSocket frame definitions.
//!
//! Frames are JSON text, discriminated by an UPPERCASE `type` tag. Change
//! events pass through with their own tag (`INSERT`, `UPDATE`, `DELETE`,
//! `REACTION`) and are serialized straight from
//! [`huddle_core::events::ChangeEvent`]; the enums here cover everything
//! else. An inbound frame with an unknown tag or missing fields fails
//! deserialization and is dropped without terminating the session.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use huddle_core::types::id::{ChannelId, OrganizationId, SessionId, UserId};

use crate::presence::status::PresenceStatus;

/// Frames sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ServerFrame {
    /// Heartbeat probe; the client must echo a `PONG`.
    Ping {
        /// Server timestamp in epoch milliseconds.
        timestamp: i64,
    },
    /// Handshake acknowledgement after a subscription is registered.
    #[serde(rename_all = "camelCase")]
    Connected {
        /// Whether this connection receives workspace notifications.
        notifications: bool,
        /// Echoed channel scope.
        #[serde(skip_serializing_if = "Option::is_none")]
        channel_id: Option<ChannelId>,
        /// Echoed DM session scope.
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    /// Presence snapshot for one organization.
    #[serde(rename_all = "camelCase")]
    Presence {
        /// The organization this snapshot covers.
        organization_id: OrganizationId,
        /// User → derived status; absent users are offline.
        presence: HashMap<UserId, PresenceStatus>,
    },
    /// Typing signal relayed from another connection in the same scope.
    Typing(TypingFrame),
}

impl ServerFrame {
    /// A ping stamped with the current time.
    pub fn ping_now() -> Self {
        Self::Ping {
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Frames sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ClientFrame {
    /// Response to a server `PING`.
    Pong {
        /// Echoed server timestamp.
        timestamp: i64,
    },
    /// The user is present at the keyboard.
    Activity,
    /// The user started or stopped typing in this connection's scope.
    Typing(TypingFrame),
}

/// Typing signal payload, shared between the inbound frame and its relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingFrame {
    /// Channel scope of the signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    /// DM session scope of the signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Thread within the scope, when typing in a thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<uuid::Uuid>,
    /// Who is typing.
    pub user: TypingUser,
    /// `false` when the user explicitly stopped typing.
    pub is_typing: bool,
}

/// Identity attached to a typing signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingUser {
    /// The typing user's id.
    pub id: UserId,
    /// Display name rendered in the indicator.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_serializes_with_uppercase_tag() {
        let frame = ServerFrame::Ping { timestamp: 1700000000000 };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"PING""#));
        assert!(json.contains(r#""timestamp":1700000000000"#));
    }

    #[test]
    fn connected_omits_empty_scope() {
        let frame = ServerFrame::Connected {
            notifications: true,
            channel_id: None,
            session_id: None,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"CONNECTED""#));
        assert!(!json.contains("channelId"));
        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn presence_snapshot_uses_uuid_keys() {
        let user = UserId::new();
        let mut presence = HashMap::new();
        presence.insert(user, PresenceStatus::Away);

        let frame = ServerFrame::Presence {
            organization_id: OrganizationId::new(),
            presence,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(&user.to_string()));
        assert!(json.contains(r#""away""#));
    }

    #[test]
    fn client_pong_parses() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"PONG","timestamp":123}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Pong { timestamp: 123 }));
    }

    #[test]
    fn client_activity_parses_without_payload() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ACTIVITY"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Activity));
    }

    #[test]
    fn typing_round_trips_through_relay() {
        let channel = ChannelId::new();
        let raw = format!(
            r#"{{"type":"TYPING","channelId":"{channel}","user":{{"id":"{}","name":"ada"}},"isTyping":true}}"#,
            UserId::new()
        );
        let frame: ClientFrame = serde_json::from_str(&raw).unwrap();
        let ClientFrame::Typing(signal) = frame else {
            panic!("expected typing frame");
        };
        assert_eq!(signal.channel_id, Some(channel));
        assert!(signal.is_typing);

        let relayed = serde_json::to_string(&ServerFrame::Typing(signal)).unwrap();
        assert!(relayed.contains(r#""type":"TYPING""#));
        assert!(relayed.contains(r#""name":"ada""#));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"type":"BANANA"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"type":"PONG"}"#);
        assert!(result.is_err());
    }
}
