//! # huddle-realtime
//!
//! Realtime fan-out and presence engine for Huddle. Provides:
//!
//! - Subscription registry for live WebSocket connections and their scope
//! - Central heartbeat monitor that pings subscribers and reaps the dead
//! - Per-organization presence tracking (online/away/offline) derived from
//!   connection counts and activity timestamps
//! - Event routing from the durable change feed to matching subscriptions,
//!   with a two-tier match (direct scope, then notification subscribers)
//! - Typing signal relay scoped to channels and DM sessions
//!
//! The engine is a singleton with an injected lifecycle: construct with
//! [`RealtimeEngine::new`], wire a change-event receiver into
//! [`RealtimeEngine::start`], and tear down with [`RealtimeEngine::stop`].

pub mod engine;
pub mod heartbeat;
pub mod message;
pub mod presence;
pub mod router;
pub mod subscription;

pub use engine::{RealtimeEngine, SubscriptionScope};
pub use presence::tracker::PresenceTracker;
pub use router::EventRouter;
pub use subscription::registry::SubscriptionRegistry;
