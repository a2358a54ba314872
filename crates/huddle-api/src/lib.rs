//! # huddle-api
//!
//! HTTP and WebSocket surface for the Huddle realtime subsystem. Exposes
//! the `/ws` subscribe endpoint (with its handshake authorization), the
//! in-memory presence query, and health checks. Everything else a chat
//! application serves — message CRUD, uploads, admin — lives outside this
//! repository.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
