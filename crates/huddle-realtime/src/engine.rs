//! Top-level realtime engine that ties the subsystems together.
//!
//! An explicit singleton with an injected lifecycle: constructed once at
//! startup, started with the change-event receiver, stopped on shutdown.
//! Nothing here is ambient module state, so tests can build as many
//! engines as they like without leakage.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use huddle_core::config::realtime::RealtimeConfig;
use huddle_core::events::ChangeEvent;
use huddle_core::types::id::{ChannelId, OrganizationId, SessionId, UserId};

use crate::heartbeat::HeartbeatMonitor;
use crate::message::frames::ServerFrame;
use crate::presence::tracker::PresenceTracker;
use crate::router::EventRouter;
use crate::subscription::handle::{SubscriptionHandle, SubscriptionId};
use crate::subscription::registry::SubscriptionRegistry;

/// Scope parameters for a new subscription, gathered during the handshake.
///
/// Authorization against these values happens before registration; the
/// engine trusts its caller.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionScope {
    /// The authenticated user.
    pub user_id: UserId,
    /// The organization the connection belongs to.
    pub organization_id: OrganizationId,
    /// Channel the client is viewing, if any.
    pub channel_id: Option<ChannelId>,
    /// DM session the client is viewing, if any.
    pub session_id: Option<SessionId>,
    /// Whether the client wants workspace-wide notifications.
    pub notifications: bool,
}

/// Central realtime engine coordinating registry, presence, routing, and
/// liveness monitoring.
#[derive(Debug)]
pub struct RealtimeEngine {
    /// Live subscriptions.
    registry: Arc<SubscriptionRegistry>,
    /// Presence state.
    presence: Arc<PresenceTracker>,
    /// Event router.
    router: Arc<EventRouter>,
    /// Configuration.
    config: RealtimeConfig,
    /// Shutdown signal for background tasks.
    shutdown_tx: broadcast::Sender<()>,
}

impl RealtimeEngine {
    /// Creates a new engine with all subsystems.
    pub fn new(config: &RealtimeConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = Arc::new(SubscriptionRegistry::new());
        let presence = Arc::new(PresenceTracker::new(config.away_timeout_seconds));
        let router = Arc::new(EventRouter::new(registry.clone(), presence.clone()));

        info!("Realtime engine initialized");

        Self {
            registry,
            presence,
            router,
            config: config.clone(),
            shutdown_tx,
        }
    }

    /// The subscription registry.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// The presence tracker (the synchronous "who is online" surface).
    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    /// The event router.
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// Register an authorized connection.
    ///
    /// Returns the handle plus the receiver the socket task drains for
    /// outbound frames. Increments presence and broadcasts the transition
    /// when this is the user's first connection.
    pub fn register(
        &self,
        scope: SubscriptionScope,
    ) -> (Arc<SubscriptionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.outbound_buffer_size);
        let handle = Arc::new(SubscriptionHandle::new(
            scope.user_id,
            scope.organization_id,
            scope.channel_id,
            scope.session_id,
            scope.notifications,
            tx,
        ));
        self.registry.insert(handle.clone());

        let came_online = self
            .presence
            .connect(scope.organization_id, scope.user_id);
        if came_online {
            self.router.broadcast_presence(scope.organization_id);
        }

        info!(
            subscription_id = %handle.id,
            user_id = %scope.user_id,
            organization_id = %scope.organization_id,
            notifications = scope.notifications,
            "Subscription registered"
        );

        (handle, rx)
    }

    /// Remove a subscription and settle presence. Idempotent.
    pub fn unregister(&self, id: &SubscriptionId) {
        self.router.remove_subscription(id);
    }

    /// The `CONNECTED` acknowledgement frame for a freshly registered
    /// subscription.
    pub fn connected_frame(&self, scope: &SubscriptionScope) -> ServerFrame {
        ServerFrame::Connected {
            notifications: scope.notifications,
            channel_id: scope.channel_id,
            session_id: scope.session_id,
        }
    }

    /// Start the background tasks: the heartbeat monitor and the single
    /// event pump consuming the change feed.
    ///
    /// One pump task means events for the same scope are delivered in
    /// publish order; nothing is guaranteed across scopes.
    pub fn start(&self, mut events: mpsc::Receiver<ChangeEvent>) {
        let monitor = HeartbeatMonitor::new(
            self.registry.clone(),
            self.router.clone(),
            &self.config,
        );
        let heartbeat_shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            monitor.run(heartbeat_shutdown).await;
        });

        let router = self.router.clone();
        let mut pump_shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => router.handle_change_event(&event),
                        None => {
                            debug!("Change-event feed closed, stopping pump");
                            break;
                        }
                    },
                    _ = pump_shutdown.recv() => break,
                }
            }
        });

        info!("Realtime engine started");
    }

    /// Stop background tasks and drop every live subscription.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        let drained = self.registry.drain();
        for handle in &drained {
            handle.mark_dead();
        }
        self.presence.clear();
        info!(connections = drained.len(), "Realtime engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::events::ChangeKind;

    fn scope(org: OrganizationId, user: UserId) -> SubscriptionScope {
        SubscriptionScope {
            user_id: user,
            organization_id: org,
            channel_id: None,
            session_id: None,
            notifications: true,
        }
    }

    #[tokio::test]
    async fn register_then_unregister_keeps_counts_consistent() {
        let engine = Arc::new(RealtimeEngine::new(&RealtimeConfig::default()));
        let org = OrganizationId::new();
        let user = UserId::new();

        let (first, _rx1) = engine.register(scope(org, user));
        let (_second, _rx2) = engine.register(scope(org, user));
        assert_eq!(engine.registry().count_for_user(org, user), 2);

        engine.unregister(&first.id);
        engine.unregister(&first.id);
        assert_eq!(engine.registry().count_for_user(org, user), 1);
        assert_eq!(engine.presence().online_count(org), 1);
    }

    #[tokio::test]
    async fn event_pump_routes_published_events_in_order() {
        let engine = Arc::new(RealtimeEngine::new(&RealtimeConfig::default()));
        let org = OrganizationId::new();
        let channel = ChannelId::new();

        let (_handle, mut rx) = engine.register(SubscriptionScope {
            user_id: UserId::new(),
            organization_id: org,
            channel_id: Some(channel),
            session_id: None,
            notifications: false,
        });

        let (tx, events) = mpsc::channel(8);
        engine.start(events);

        for kind in [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete] {
            tx.send(ChangeEvent {
                kind,
                channel_id: Some(channel),
                session_id: None,
                organization_id: org,
                message: None,
                message_id: None,
                channel_is_private: false,
                channel_member_ids: Vec::new(),
                participant_ids: Vec::new(),
            })
            .await
            .unwrap();
        }

        // Skip presence frames from registration; change events must come
        // through in publish order.
        let mut kinds = Vec::new();
        while kinds.len() < 3 {
            let frame = rx.recv().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            let kind = value["type"].as_str().unwrap().to_string();
            if kind != "PRESENCE" {
                kinds.push(kind);
            }
        }
        assert_eq!(kinds, vec!["INSERT", "UPDATE", "DELETE"]);

        engine.stop();
    }

    #[tokio::test]
    async fn stop_drains_registry_and_presence() {
        let engine = Arc::new(RealtimeEngine::new(&RealtimeConfig::default()));
        let org = OrganizationId::new();
        let (handle, _rx) = engine.register(scope(org, UserId::new()));

        engine.stop();

        assert!(engine.registry().is_empty());
        assert_eq!(engine.presence().online_count(org), 0);
        assert!(!handle.is_sendable());
    }
}
