//! Supervised change-event listener.
//!
//! One process-wide `LISTEN` connection feeds the whole realtime engine.
//! While it is down the REST API keeps working but nothing reaches live
//! clients, so a drop is logged at `error!` and retried with doubling
//! backoff until the subscription is re-established. The listener must
//! outlive every subscription; it only stops on shutdown.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use huddle_core::config::realtime::RealtimeConfig;
use huddle_core::events::ChangeEvent;

/// Supervised singleton around [`PgListener`].
pub struct ChangeEventListener {
    pool: PgPool,
    channels: Vec<String>,
    events: mpsc::Sender<ChangeEvent>,
    retry_initial: Duration,
    retry_max: Duration,
}

impl ChangeEventListener {
    /// Creates a listener that forwards parsed events into `events`.
    pub fn new(pool: PgPool, config: &RealtimeConfig, events: mpsc::Sender<ChangeEvent>) -> Self {
        Self {
            pool,
            channels: config.event_channels.clone(),
            events,
            retry_initial: Duration::from_millis(config.listener_retry_initial_ms),
            retry_max: Duration::from_millis(config.listener_retry_max_ms),
        }
    }

    /// Run until shutdown, reconnecting and re-`LISTEN`ing as needed.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut retry = self.retry_initial;

        loop {
            let mut listener = match self.subscribe().await {
                Ok(listener) => {
                    info!(channels = ?self.channels, "Change-event listener subscribed");
                    retry = self.retry_initial;
                    listener
                }
                Err(e) => {
                    error!(
                        error = %e,
                        retry_ms = retry.as_millis() as u64,
                        "Change-event listener down; live updates are DISABLED until it reconnects"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(retry) => {
                            retry = (retry * 2).min(self.retry_max);
                            continue;
                        }
                        _ = shutdown.recv() => break,
                    }
                }
            };

            loop {
                tokio::select! {
                    notification = listener.recv() => match notification {
                        Ok(notification) => self.forward(notification.channel(), notification.payload()).await,
                        Err(e) => {
                            error!(
                                error = %e,
                                "Change-event listener connection lost; live updates are DISABLED until it reconnects"
                            );
                            break;
                        }
                    },
                    _ = shutdown.recv() => {
                        info!("Change-event listener stopped");
                        return;
                    }
                }
            }
        }
    }

    async fn subscribe(&self) -> Result<PgListener, sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        let channels: Vec<&str> = self.channels.iter().map(String::as_str).collect();
        listener.listen_all(channels).await?;
        Ok(listener)
    }

    async fn forward(&self, channel: &str, payload: &str) {
        let event = match ChangeEvent::from_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    channel,
                    error = %e,
                    "Dropping malformed change-event payload"
                );
                return;
            }
        };

        if self.events.send(event).await.is_err() {
            warn!("Change-event receiver dropped; discarding event");
        }
    }
}
