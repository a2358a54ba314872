//! # huddle-client
//!
//! Client-side half of the Huddle realtime protocol:
//!
//! - [`backoff::ReconnectPolicy`] — jitter-free exponential backoff
//! - [`controller::ReconnectController`] — the connection status machine,
//!   including the intentional-close flag that distinguishes a network
//!   blip from a deliberate teardown
//! - [`typing::TypingTracker`] — per-scope typing aggregation with local
//!   expiry and label rendering
//! - [`activity::ActivityThrottle`] — periodic and input-driven presence
//!   signals
//! - [`dispatcher::NotificationHub`] — explicit observer list for fanning
//!   inbound frames out to UI components
//! - [`socket::ChatSocket`] — the tokio-tungstenite connection loop tying
//!   the pieces together

pub mod activity;
pub mod backoff;
pub mod controller;
pub mod dispatcher;
pub mod socket;
pub mod typing;

pub use backoff::ReconnectPolicy;
pub use controller::{ConnectionStatus, ReconnectController};
pub use dispatcher::NotificationHub;
pub use socket::{ChatSocket, SocketCommand, SocketEvent, SocketScope};
pub use typing::TypingTracker;
