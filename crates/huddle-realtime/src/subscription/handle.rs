//! Individual WebSocket subscription handle.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use huddle_core::events::ChangeEvent;
use huddle_core::types::id::{ChannelId, OrganizationId, SessionId, UserId};

/// Unique subscription identifier.
pub type SubscriptionId = Uuid;

/// A handle to a single live subscription.
///
/// Holds the sender half of the outbound frame channel plus the scope the
/// connection was admitted with. Exactly one handle exists per physical
/// WebSocket connection; a user with several tabs holds several handles.
///
/// Liveness is two separate facts: `dead` is terminal (the socket is gone
/// for good), while `awaiting_pong` tracks the ping/pong cycle — a
/// subscription between a ping and its pong is still perfectly sendable.
#[derive(Debug)]
pub struct SubscriptionHandle {
    /// Unique subscription ID.
    pub id: SubscriptionId,
    /// User who owns this connection.
    pub user_id: UserId,
    /// Organization the connection is scoped to.
    pub organization_id: OrganizationId,
    /// Channel scope, when the client is viewing a channel.
    pub channel_id: Option<ChannelId>,
    /// DM session scope, when the client is viewing a conversation.
    pub session_id: Option<SessionId>,
    /// Whether this connection also receives workspace-wide notifications.
    pub notifications: bool,
    /// Sender for serialized outbound frames.
    sender: mpsc::Sender<String>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last pong received.
    last_pong: RwLock<DateTime<Utc>>,
    /// Set by the ping pass, cleared by a pong.
    awaiting_pong: AtomicBool,
    /// Terminal: the connection is unusable and will be reaped.
    dead: AtomicBool,
}

impl SubscriptionHandle {
    /// Create a new subscription handle.
    pub fn new(
        user_id: UserId,
        organization_id: OrganizationId,
        channel_id: Option<ChannelId>,
        session_id: Option<SessionId>,
        notifications: bool,
        sender: mpsc::Sender<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            channel_id,
            session_id,
            notifications,
            sender,
            connected_at: now,
            last_pong: RwLock::new(now),
            awaiting_pong: AtomicBool::new(false),
            dead: AtomicBool::new(false),
        }
    }

    /// The single predicate for "this connection can still take a frame".
    ///
    /// Every push site uses this instead of inspecting socket state, so
    /// dead-connection pruning stays in one place (the reap pass).
    pub fn is_sendable(&self) -> bool {
        !self.dead.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    /// Send a serialized frame to this connection.
    ///
    /// A full buffer drops the frame; the next heartbeat cycle decides
    /// whether the connection is actually dead. A closed channel marks the
    /// handle dead immediately.
    pub fn send(&self, frame: String) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    subscription_id = %self.id,
                    "Outbound buffer full, dropping frame"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Whether a ping is outstanding.
    pub fn is_awaiting_pong(&self) -> bool {
        self.awaiting_pong.load(Ordering::SeqCst)
    }

    /// Note that a ping was just sent and a pong is now owed.
    pub fn mark_awaiting_pong(&self) {
        self.awaiting_pong.store(true, Ordering::SeqCst);
    }

    /// Mark the connection as dead so no further frames are pushed.
    pub fn mark_dead(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    /// Record a pong response, settling the outstanding ping.
    pub fn record_pong(&self) {
        self.awaiting_pong.store(false, Ordering::SeqCst);
        let mut lp = self.last_pong.write().unwrap_or_else(|e| e.into_inner());
        *lp = Utc::now();
    }

    /// When the last pong was received.
    pub fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a change event directly matches this connection's scope.
    pub fn matches_direct(&self, event: &ChangeEvent) -> bool {
        (event.channel_id.is_some() && event.channel_id == self.channel_id)
            || (event.session_id.is_some() && event.session_id == self.session_id)
    }

    #[cfg(test)]
    pub(crate) fn backdate_pong(&self, seconds: i64) {
        let mut lp = self.last_pong.write().unwrap_or_else(|e| e.into_inner());
        *lp = Utc::now() - chrono::Duration::seconds(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with_buffer(capacity: usize) -> (SubscriptionHandle, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = SubscriptionHandle::new(
            UserId::new(),
            OrganizationId::new(),
            None,
            None,
            false,
            tx,
        );
        (handle, rx)
    }

    #[tokio::test]
    async fn send_delivers_frame() {
        let (handle, mut rx) = handle_with_buffer(4);
        assert!(handle.send("{\"type\":\"PING\"}".to_string()));
        assert_eq!(rx.recv().await.unwrap(), "{\"type\":\"PING\"}");
    }

    #[tokio::test]
    async fn full_buffer_drops_without_marking_dead() {
        let (handle, _rx) = handle_with_buffer(1);
        assert!(handle.send("a".to_string()));
        assert!(!handle.send("b".to_string()));
        assert!(handle.is_sendable());
    }

    #[tokio::test]
    async fn closed_receiver_marks_dead() {
        let (handle, rx) = handle_with_buffer(1);
        drop(rx);
        assert!(!handle.send("a".to_string()));
        assert!(!handle.is_sendable());
    }

    #[tokio::test]
    async fn awaiting_pong_does_not_block_sends() {
        let (handle, mut rx) = handle_with_buffer(4);
        handle.mark_awaiting_pong();

        assert!(handle.is_awaiting_pong());
        assert!(handle.is_sendable());
        assert!(handle.send("frame".to_string()));
        assert_eq!(rx.recv().await.unwrap(), "frame");
    }

    #[tokio::test]
    async fn pong_settles_the_outstanding_ping() {
        let (handle, _rx) = handle_with_buffer(1);
        handle.mark_awaiting_pong();
        handle.record_pong();
        assert!(!handle.is_awaiting_pong());
    }
}
