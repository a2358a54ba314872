//! Connection authentication port.
//!
//! The authentication protocol itself (how session tokens are minted and
//! refreshed) lives in an external service. The realtime stack only needs
//! to resolve an opaque token into a user before admitting a connection.

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::id::UserId;

/// Identity resolved from a session token during the WebSocket handshake.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The authenticated user.
    pub user_id: UserId,
    /// Display name, used for typing indicators and logs.
    pub display_name: String,
}

/// Resolves session tokens into authenticated users.
///
/// Implementations must fail closed: any token that cannot be positively
/// resolved is an [`AppError::authentication`] error, and the caller closes
/// the connection without sending a frame.
#[async_trait]
pub trait ConnectionAuthenticator: Send + Sync {
    /// Authenticate an opaque bearer token.
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError>;
}
