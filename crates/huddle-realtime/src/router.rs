//! Event router — matches change events and inbound client frames against
//! the subscription registry and pushes frames to the sockets that qualify.
//!
//! Matching precedence for a change event:
//!
//! 1. Direct scope match (the subscriber is viewing the channel/session) —
//!    always forwarded.
//! 2. Notification-subscriber match — `INSERT` only, same organization,
//!    gated on the event's authorization hints so private-channel and DM
//!    content never leaks to non-members.
//! 3. No match — dropped. There is no retry or queue; reconnecting clients
//!    reconcile through the REST layer.

use std::sync::Arc;

use tracing::{debug, error};

use huddle_core::events::{ChangeEvent, ChangeKind};
use huddle_core::types::id::OrganizationId;

use crate::message::frames::{ClientFrame, ServerFrame, TypingFrame};
use crate::presence::tracker::PresenceTracker;
use crate::subscription::handle::{SubscriptionHandle, SubscriptionId};
use crate::subscription::registry::SubscriptionRegistry;

/// Routes change events, presence snapshots, and typing signals to
/// matching subscriptions.
#[derive(Debug)]
pub struct EventRouter {
    /// Live subscriptions.
    registry: Arc<SubscriptionRegistry>,
    /// Presence state.
    presence: Arc<PresenceTracker>,
}

impl EventRouter {
    /// Creates a new router over the shared registry and presence tracker.
    pub fn new(registry: Arc<SubscriptionRegistry>, presence: Arc<PresenceTracker>) -> Self {
        Self { registry, presence }
    }

    /// Fan a change event out to every matching subscription.
    pub fn handle_change_event(&self, event: &ChangeEvent) {
        let frame = match serde_json::to_string(event) {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, "Failed to serialize change event");
                return;
            }
        };

        let mut delivered = 0usize;
        for handle in self.registry.all() {
            if !handle.is_sendable() {
                continue;
            }
            if Self::matches(event, &handle) && handle.send(frame.clone()) {
                delivered += 1;
            }
        }

        debug!(
            kind = ?event.kind,
            organization_id = %event.organization_id,
            delivered,
            "Change event routed"
        );
    }

    /// Whether a change event should be delivered to a subscription.
    fn matches(event: &ChangeEvent, sub: &SubscriptionHandle) -> bool {
        // Tier 1: a user actively viewing the scope always gets the update.
        if sub.matches_direct(event) {
            return true;
        }

        // Tier 2: notification subscribers hear about new activity across
        // the workspace, but only inserts, only within their organization,
        // and never from private scopes they are not a member of.
        if !sub.notifications || event.kind != ChangeKind::Insert {
            return false;
        }
        if event.organization_id != sub.organization_id {
            return false;
        }

        if event.channel_id.is_some() {
            if event.channel_is_private {
                return event.channel_member_ids.contains(&sub.user_id);
            }
            return true;
        }
        if event.session_id.is_some() {
            return event.participant_ids.contains(&sub.user_id);
        }

        false
    }

    /// Process a raw inbound frame from a client connection.
    ///
    /// Malformed frames are dropped without closing the connection: a
    /// single bad frame must not terminate a session.
    pub fn handle_client_frame(&self, sender: &Arc<SubscriptionHandle>, raw: &str) {
        let frame = match serde_json::from_str::<ClientFrame>(raw) {
            Ok(f) => f,
            Err(e) => {
                debug!(
                    subscription_id = %sender.id,
                    error = %e,
                    "Dropping malformed inbound frame"
                );
                return;
            }
        };

        match frame {
            ClientFrame::Pong { .. } => {
                sender.record_pong();
            }
            ClientFrame::Activity => {
                self.record_activity(sender);
            }
            ClientFrame::Typing(signal) => {
                // Typing implies the user is present at the keyboard.
                self.record_activity(sender);
                self.relay_typing(sender, signal);
            }
        }
    }

    fn record_activity(&self, sender: &Arc<SubscriptionHandle>) {
        let came_back = self
            .presence
            .record_activity(sender.organization_id, sender.user_id);
        if came_back {
            self.broadcast_presence(sender.organization_id);
        }
    }

    /// Relay a typing signal to the other connections sharing the sender's
    /// direct scope. Never echoed back to the sender.
    fn relay_typing(&self, sender: &Arc<SubscriptionHandle>, signal: TypingFrame) {
        if signal.user.id.is_nil() {
            debug!(subscription_id = %sender.id, "Dropping typing signal without user id");
            return;
        }
        // The signal's scope must be the scope this connection was admitted
        // with; anything else is a spoof attempt or a client bug.
        let scope_ok = (signal.channel_id.is_some() && signal.channel_id == sender.channel_id)
            || (signal.session_id.is_some() && signal.session_id == sender.session_id);
        if !scope_ok {
            debug!(
                subscription_id = %sender.id,
                "Dropping typing signal outside the connection's own scope"
            );
            return;
        }

        let frame = match serde_json::to_string(&ServerFrame::Typing(signal.clone())) {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, "Failed to serialize typing relay");
                return;
            }
        };

        for handle in self.registry.all() {
            if handle.id == sender.id || !handle.is_sendable() {
                continue;
            }
            let shares_scope = (signal.channel_id.is_some()
                && handle.channel_id == signal.channel_id)
                || (signal.session_id.is_some() && handle.session_id == signal.session_id);
            if shares_scope {
                handle.send(frame.clone());
            }
        }
    }

    /// Push a presence snapshot to every subscription in the organization.
    ///
    /// The snapshot reflects state at broadcast time; it is not serialized
    /// against message traffic.
    pub fn broadcast_presence(&self, org: OrganizationId) {
        let snapshot = self.presence.snapshot(org);
        let frame = match serde_json::to_string(&ServerFrame::Presence {
            organization_id: org,
            presence: snapshot,
        }) {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, "Failed to serialize presence snapshot");
                return;
            }
        };

        for handle in self.registry.for_org(org) {
            if handle.is_sendable() {
                handle.send(frame.clone());
            }
        }
    }

    /// Remove a subscription and settle its presence contribution.
    ///
    /// Idempotent: shared by socket teardown and the liveness reaper, which
    /// can race each other on the same connection.
    pub fn remove_subscription(&self, id: &SubscriptionId) {
        let Some(handle) = self.registry.remove(id) else {
            return;
        };
        handle.mark_dead();

        let went_offline = self
            .presence
            .disconnect(handle.organization_id, handle.user_id);
        if went_offline {
            self.broadcast_presence(handle.organization_id);
        } else {
            debug!(
                subscription_id = %handle.id,
                user_id = %handle.user_id,
                "Subscription removed, user still connected elsewhere"
            );
        }
    }
}
