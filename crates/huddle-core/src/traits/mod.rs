//! Ports implemented by adapter crates and consumed by the realtime engine.

pub mod auth;
pub mod membership;

pub use auth::{AuthenticatedUser, ConnectionAuthenticator};
pub use membership::MembershipLookup;
