//! Membership lookup port.
//!
//! The realtime handshake is the only place that blocks on the database:
//! a connection scoped to a channel or DM session must be verified against
//! the membership tables before it is admitted to the registry.

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::id::{ChannelId, OrganizationId, SessionId, UserId};

/// Answers membership questions for handshake authorization.
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    /// Whether the user belongs to the organization.
    async fn is_org_member(
        &self,
        org: OrganizationId,
        user: UserId,
    ) -> Result<bool, AppError>;

    /// Whether the user is a member of the channel within the organization.
    async fn is_channel_member(
        &self,
        org: OrganizationId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, AppError>;

    /// Whether the user participates in the DM session within the
    /// organization.
    async fn is_session_participant(
        &self,
        org: OrganizationId,
        session: SessionId,
        user: UserId,
    ) -> Result<bool, AppError>;
}
