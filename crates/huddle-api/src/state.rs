//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use huddle_core::config::AppConfig;
use huddle_core::traits::{ConnectionAuthenticator, MembershipLookup};
use huddle_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks; the auth and membership
/// ports are trait objects so tests can inject in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool (health checks).
    pub db_pool: PgPool,
    /// The realtime engine.
    pub engine: Arc<RealtimeEngine>,
    /// Session-token authenticator.
    pub authenticator: Arc<dyn ConnectionAuthenticator>,
    /// Membership lookup for handshake authorization.
    pub membership: Arc<dyn MembershipLookup>,
}
