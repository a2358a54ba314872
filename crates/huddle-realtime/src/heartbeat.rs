//! Central heartbeat and liveness monitor.
//!
//! One periodic loop for the whole process. Each cycle first runs a reap
//! pass (remove anything that is unreachable, or that still owes a pong
//! past the timeout), then a ping pass (mark every survivor as owing a
//! pong and send `PING`). A pong settles the debt, so a subscription
//! survives as long as it answers within the timeout window.
//!
//! The split between "socket still open" and "peer actually responsive"
//! matters because intermediaries can hold a TCP connection open long
//! after the peer vanished. With a 30s interval and 90s timeout, a client
//! may miss up to three pings before it is reaped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, info};

use huddle_core::config::realtime::RealtimeConfig;

use crate::message::frames::ServerFrame;
use crate::router::EventRouter;
use crate::subscription::registry::SubscriptionRegistry;

/// Periodic liveness monitor over the whole registry.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    /// Live subscriptions.
    registry: Arc<SubscriptionRegistry>,
    /// Router, for removal plus the presence broadcast it entails.
    router: Arc<EventRouter>,
    /// Interval between cycles.
    ping_interval: Duration,
    /// Pong silence tolerated before reaping.
    connection_timeout: chrono::Duration,
}

impl HeartbeatMonitor {
    /// Creates a monitor from the realtime configuration.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        router: Arc<EventRouter>,
        config: &RealtimeConfig,
    ) -> Self {
        Self {
            registry,
            router,
            ping_interval: Duration::from_secs(config.ping_interval_seconds),
            connection_timeout: chrono::Duration::seconds(config.connection_timeout_seconds as i64),
        }
    }

    /// Run the heartbeat loop until shutdown.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = time::interval(self.ping_interval);
        // The first tick fires immediately; skip it so freshly registered
        // connections get a full interval before their first ping.
        interval.tick().await;

        info!(
            interval_seconds = self.ping_interval.as_secs(),
            "Heartbeat monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.reap_pass();
                    self.ping_pass();
                }
                _ = shutdown.recv() => {
                    info!("Heartbeat monitor stopped");
                    break;
                }
            }
        }
    }

    /// Remove every subscription that is unreachable or past the pong
    /// timeout, settling presence for each.
    pub fn reap_pass(&self) {
        let now = Utc::now();
        let mut reaped = 0usize;

        for handle in self.registry.all() {
            let unreachable = !handle.is_sendable();
            let timed_out =
                handle.is_awaiting_pong() && now - handle.last_pong() > self.connection_timeout;

            if unreachable || timed_out {
                debug!(
                    subscription_id = %handle.id,
                    user_id = %handle.user_id,
                    unreachable,
                    timed_out,
                    "Reaping dead subscription"
                );
                self.router.remove_subscription(&handle.id);
                reaped += 1;
            }
        }

        if reaped > 0 {
            info!(reaped, remaining = self.registry.len(), "Reap pass complete");
        }
    }

    /// Mark every survivor as owing a pong and send a ping.
    pub fn ping_pass(&self) {
        let frame = match serde_json::to_string(&ServerFrame::ping_now()) {
            Ok(f) => f,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize ping frame");
                return;
            }
        };

        for handle in self.registry.all() {
            if !handle.is_sendable() {
                continue;
            }
            handle.mark_awaiting_pong();
            handle.send(frame.clone());
        }
    }
}
