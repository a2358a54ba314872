//! # huddle-core
//!
//! Shared foundation for the Huddle realtime stack:
//!
//! - Configuration schemas loaded from TOML + environment
//! - The unified [`error::AppError`] type used across all crates
//! - Newtype identifiers for users, organizations, channels, and DM sessions
//! - Ports implemented by the database layer and consumed by the realtime
//!   engine (authentication, membership lookup)
//! - The change-event wire type emitted by write transactions

pub mod config;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;
