//! WebSocket upgrade handler and connection lifecycle.
//!
//! Handshake sequence, all before the upgrade completes:
//!
//! 1. Resolve the bearer token from the request headers (external auth
//!    service owns the protocol); no token or a bad token closes the
//!    attempt with no frame.
//! 2. The token's user must match the `userId` query parameter.
//! 3. The user must belong to the requested organization.
//! 4. A `channelId` scope requires channel membership; a `sessionId`
//!    scope requires DM participation.
//!
//! Only then is the subscription registered, presence incremented, and the
//! `CONNECTED` acknowledgement sent.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info};

use huddle_core::error::AppError;
use huddle_core::types::id::{ChannelId, OrganizationId, SessionId, UserId};
use huddle_realtime::engine::SubscriptionScope;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the `/ws` handshake.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    /// Channel the client is viewing.
    pub channel_id: Option<ChannelId>,
    /// DM session the client is viewing.
    pub session_id: Option<SessionId>,
    /// The connecting user; must match the authenticated session.
    pub user_id: UserId,
    /// The organization to scope presence and notifications to.
    pub organization_id: OrganizationId,
    /// Whether this connection receives workspace-wide notifications.
    #[serde(default)]
    pub notifications: bool,
}

/// GET /ws — WebSocket upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::authentication("Missing bearer token"))?;
    let auth = state.authenticator.authenticate(token).await?;

    if auth.user_id != query.user_id {
        return Err(AppError::authentication("Session does not match userId").into());
    }

    if !state
        .membership
        .is_org_member(query.organization_id, auth.user_id)
        .await?
    {
        return Err(AppError::authorization("Not a member of the organization").into());
    }

    if let Some(channel) = query.channel_id {
        if !state
            .membership
            .is_channel_member(query.organization_id, channel, auth.user_id)
            .await?
        {
            return Err(AppError::authorization("Not a member of the channel").into());
        }
    }

    if let Some(session) = query.session_id {
        if !state
            .membership
            .is_session_participant(query.organization_id, session, auth.user_id)
            .await?
        {
            return Err(AppError::authorization("Not a participant of the session").into());
        }
    }

    let scope = SubscriptionScope {
        user_id: auth.user_id,
        organization_id: query.organization_id,
        channel_id: query.channel_id,
        session_id: query.session_id,
        notifications: query.notifications,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(state, scope, socket)))
}

/// Extract a bearer token from the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Drive an admitted connection until it closes.
async fn handle_socket(state: AppState, scope: SubscriptionScope, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state.engine.register(scope);
    let subscription_id = handle.id;

    let connected = match serde_json::to_string(&state.engine.connected_frame(&scope)) {
        Ok(frame) => frame,
        Err(e) => {
            error!(error = %e, "Failed to serialize CONNECTED frame");
            state.engine.unregister(&subscription_id);
            return;
        }
    };
    if ws_tx.send(Message::Text(connected.into())).await.is_err() {
        // Client vanished between upgrade and acknowledgement.
        state.engine.unregister(&subscription_id);
        return;
    }

    info!(
        subscription_id = %subscription_id,
        user_id = %scope.user_id,
        "WebSocket connection established"
    );

    // Forward engine frames to the socket.
    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Process inbound frames until the peer goes away.
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state
                    .engine
                    .router()
                    .handle_client_frame(&handle, text.as_str());
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "WebSocket read error"
                );
                break;
            }
        }
    }

    outbound_task.abort();
    state.engine.unregister(&subscription_id);

    info!(
        subscription_id = %subscription_id,
        user_id = %scope.user_id,
        "WebSocket connection closed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_strips_the_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn missing_or_malformed_authorization_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
