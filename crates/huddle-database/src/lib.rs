//! # huddle-database
//!
//! PostgreSQL adapters for the Huddle realtime stack. This crate contains
//! only what the realtime core consumes: the connection pool, the
//! handshake membership lookups, session-token authentication, and the
//! supervised LISTEN/NOTIFY change-event listener. CRUD over the chat
//! schema lives elsewhere and is out of scope here.

pub mod connection;
pub mod listener;
pub mod membership;
pub mod session_auth;

pub use connection::create_pool;
pub use listener::ChangeEventListener;
pub use membership::PgMembershipLookup;
pub use session_auth::PgConnectionAuthenticator;
