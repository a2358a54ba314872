//! Membership lookups backing the WebSocket handshake authorization.
//!
//! Expected tables: `organization_members (organization_id, user_id)`,
//! `channels (id, organization_id)`, `channel_members (channel_id,
//! user_id)`, `dm_sessions (id, organization_id)`, and
//! `session_participants (session_id, user_id)`.

use async_trait::async_trait;
use sqlx::PgPool;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::traits::MembershipLookup;
use huddle_core::types::id::{ChannelId, OrganizationId, SessionId, UserId};

/// Postgres-backed [`MembershipLookup`].
#[derive(Debug, Clone)]
pub struct PgMembershipLookup {
    pool: PgPool,
}

impl PgMembershipLookup {
    /// Creates a lookup over the shared pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, query: &str, binds: &[uuid::Uuid]) -> Result<bool, AppError> {
        let mut q = sqlx::query_scalar::<_, bool>(query);
        for bind in binds {
            q = q.bind(bind);
        }
        q.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Membership query failed: {e}"), e)
        })
    }
}

#[async_trait]
impl MembershipLookup for PgMembershipLookup {
    async fn is_org_member(
        &self,
        org: OrganizationId,
        user: UserId,
    ) -> Result<bool, AppError> {
        self.exists(
            r#"SELECT EXISTS(
                   SELECT 1 FROM organization_members
                   WHERE organization_id = $1 AND user_id = $2
               )"#,
            &[org.into_uuid(), user.into_uuid()],
        )
        .await
    }

    async fn is_channel_member(
        &self,
        org: OrganizationId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, AppError> {
        self.exists(
            r#"SELECT EXISTS(
                   SELECT 1
                   FROM channel_members cm
                   JOIN channels c ON c.id = cm.channel_id
                   WHERE c.organization_id = $1
                     AND cm.channel_id = $2
                     AND cm.user_id = $3
               )"#,
            &[org.into_uuid(), channel.into_uuid(), user.into_uuid()],
        )
        .await
    }

    async fn is_session_participant(
        &self,
        org: OrganizationId,
        session: SessionId,
        user: UserId,
    ) -> Result<bool, AppError> {
        self.exists(
            r#"SELECT EXISTS(
                   SELECT 1
                   FROM session_participants sp
                   JOIN dm_sessions s ON s.id = sp.session_id
                   WHERE s.organization_id = $1
                     AND sp.session_id = $2
                     AND sp.user_id = $3
               )"#,
            &[org.into_uuid(), session.into_uuid(), user.into_uuid()],
        )
        .await
    }
}
