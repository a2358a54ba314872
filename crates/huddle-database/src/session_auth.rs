//! Session-token authentication adapter.
//!
//! The authentication protocol itself (login, token minting, refresh) is
//! owned by an external auth service. This adapter only resolves a bearer
//! token that service issued into a user row, which is all the realtime
//! handshake needs. Expected tables: `auth_sessions (token, user_id,
//! expires_at)` and `users (id, display_name)`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::traits::{AuthenticatedUser, ConnectionAuthenticator};
use huddle_core::types::id::UserId;

/// Postgres-backed [`ConnectionAuthenticator`].
#[derive(Debug, Clone)]
pub struct PgConnectionAuthenticator {
    pool: PgPool,
}

impl PgConnectionAuthenticator {
    /// Creates an authenticator over the shared pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionAuthenticator for PgConnectionAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        if token.is_empty() {
            return Err(AppError::authentication("Missing session token"));
        }

        let row = sqlx::query_as::<_, (Uuid, String)>(
            r#"SELECT s.user_id, u.display_name
               FROM auth_sessions s
               JOIN users u ON u.id = s.user_id
               WHERE s.token = $1 AND s.expires_at > NOW()"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Session lookup failed: {e}"), e)
        })?;

        match row {
            Some((user_id, display_name)) => Ok(AuthenticatedUser {
                user_id: UserId::from_uuid(user_id),
                display_name,
            }),
            None => Err(AppError::authentication("Invalid or expired session token")),
        }
    }
}
