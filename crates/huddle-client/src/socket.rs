//! Async WebSocket connection loop.
//!
//! Owns the socket for its whole lifetime: connects, reads frames, echoes
//! pongs, forwards everything else to the consumer, and reconnects with
//! exponential backoff on unexpected closes. Commands (outbound frames,
//! teardown) arrive over an mpsc channel so UI code never touches the
//! stream directly.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backoff::ReconnectPolicy;
use crate::controller::{ConnectionStatus, ReconnectController};

/// Subscription scope requested at connect time, mirrored into the `/ws`
/// query string.
#[derive(Debug, Clone)]
pub struct SocketScope {
    /// The connecting user.
    pub user_id: Uuid,
    /// The organization to scope presence and notifications to.
    pub organization_id: Uuid,
    /// Channel the client is viewing, if any.
    pub channel_id: Option<Uuid>,
    /// DM session the client is viewing, if any.
    pub session_id: Option<Uuid>,
    /// Whether to receive workspace-wide notifications.
    pub notifications: bool,
}

impl SocketScope {
    /// Render the scope as `/ws` query parameters.
    pub fn query_string(&self) -> String {
        let mut params = vec![
            format!("userId={}", self.user_id),
            format!("organizationId={}", self.organization_id),
        ];
        if let Some(channel) = self.channel_id {
            params.push(format!("channelId={channel}"));
        }
        if let Some(session) = self.session_id {
            params.push(format!("sessionId={session}"));
        }
        if self.notifications {
            params.push("notifications=true".to_string());
        }
        params.join("&")
    }
}

/// Events surfaced to the consumer.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// The connection status changed.
    Status(ConnectionStatus),
    /// A frame arrived from the server (pings are answered internally and
    /// not surfaced).
    Frame(Value),
}

/// Commands accepted by the socket task.
#[derive(Debug, Clone)]
pub enum SocketCommand {
    /// Send a frame to the server.
    Send(Value),
    /// Tear the connection down for good (no reconnect).
    Close,
}

impl SocketCommand {
    /// An `ACTIVITY` frame.
    pub fn activity() -> Self {
        Self::Send(json!({"type": "ACTIVITY"}))
    }

    /// A `TYPING` frame for a channel scope.
    pub fn typing_in_channel(
        channel_id: Uuid,
        thread_id: Option<Uuid>,
        user_id: Uuid,
        user_name: &str,
        is_typing: bool,
    ) -> Self {
        let mut frame = json!({
            "type": "TYPING",
            "channelId": channel_id,
            "user": {"id": user_id, "name": user_name},
            "isTyping": is_typing,
        });
        if let Some(thread) = thread_id {
            frame["threadId"] = json!(thread);
        }
        Self::Send(frame)
    }

    /// A `TYPING` frame for a DM session scope.
    pub fn typing_in_session(
        session_id: Uuid,
        thread_id: Option<Uuid>,
        user_id: Uuid,
        user_name: &str,
        is_typing: bool,
    ) -> Self {
        let mut frame = json!({
            "type": "TYPING",
            "sessionId": session_id,
            "user": {"id": user_id, "name": user_name},
            "isTyping": is_typing,
        });
        if let Some(thread) = thread_id {
            frame["threadId"] = json!(thread);
        }
        Self::Send(frame)
    }
}

/// Errors that prevent the socket from ever connecting.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The endpoint URL or token could not form a valid request.
    #[error("invalid connection request: {0}")]
    InvalidRequest(String),
}

/// A reconnecting WebSocket client for the Huddle realtime endpoint.
#[derive(Debug)]
pub struct ChatSocket {
    base_url: String,
    token: String,
    scope: SocketScope,
    policy: ReconnectPolicy,
}

impl ChatSocket {
    /// Creates a socket for `{base_url}/ws` with the default backoff.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, scope: SocketScope) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            scope,
            policy: ReconnectPolicy::default(),
        }
    }

    /// Override the reconnect policy.
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The full endpoint URL including scope parameters.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/ws?{}", base, self.scope.query_string())
    }

    fn build_request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, SocketError> {
        let mut request = self
            .endpoint()
            .into_client_request()
            .map_err(|e| SocketError::InvalidRequest(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| SocketError::InvalidRequest(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        Ok(request)
    }

    /// Run the connection loop until an intentional close.
    ///
    /// Status transitions and inbound frames are pushed to `events`;
    /// outbound frames and teardown arrive over `commands`.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<SocketCommand>,
        events: mpsc::Sender<SocketEvent>,
    ) -> Result<(), SocketError> {
        let mut controller = ReconnectController::new(self.policy);

        loop {
            controller.begin_connect();
            let _ = events.send(SocketEvent::Status(controller.status())).await;

            let request = self.build_request()?;
            match connect_async(request).await {
                Ok((mut ws, _response)) => {
                    controller.on_open();
                    let _ = events
                        .send(SocketEvent::Status(ConnectionStatus::Connected))
                        .await;

                    loop {
                        tokio::select! {
                            message = ws.next() => match message {
                                Some(Ok(Message::Text(text))) => {
                                    let value: Value = match serde_json::from_str(text.as_str()) {
                                        Ok(v) => v,
                                        Err(e) => {
                                            debug!(error = %e, "Dropping unparseable frame");
                                            continue;
                                        }
                                    };
                                    if value["type"] == "PING" {
                                        let pong = json!({
                                            "type": "PONG",
                                            "timestamp": value["timestamp"],
                                        });
                                        if ws.send(Message::Text(pong.to_string().into())).await.is_err() {
                                            break;
                                        }
                                        continue;
                                    }
                                    let _ = events.send(SocketEvent::Frame(value)).await;
                                }
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    warn!(error = %e, "WebSocket read error");
                                    break;
                                }
                            },
                            command = commands.recv() => match command {
                                Some(SocketCommand::Send(frame)) => {
                                    if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
                                        break;
                                    }
                                }
                                Some(SocketCommand::Close) | None => {
                                    // Flag first, then close, so the close
                                    // event cannot race a reconnect.
                                    controller.close();
                                    let _ = ws.close(None).await;
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt = controller.attempt(), "WebSocket connect failed");
                }
            }

            match controller.on_close() {
                Some(delay) => {
                    let _ = events
                        .send(SocketEvent::Status(ConnectionStatus::Reconnecting))
                        .await;
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        command = commands.recv() => {
                            if matches!(command, Some(SocketCommand::Close) | None) {
                                controller.close();
                                let _ = controller.on_close();
                                let _ = events
                                    .send(SocketEvent::Status(ConnectionStatus::Disconnected))
                                    .await;
                                return Ok(());
                            }
                        }
                    }
                }
                None => {
                    let _ = events
                        .send(SocketEvent::Status(ConnectionStatus::Disconnected))
                        .await;
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> SocketScope {
        SocketScope {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            channel_id: None,
            session_id: None,
            notifications: false,
        }
    }

    #[test]
    fn query_string_includes_required_params() {
        let s = scope();
        let qs = s.query_string();
        assert!(qs.contains(&format!("userId={}", s.user_id)));
        assert!(qs.contains(&format!("organizationId={}", s.organization_id)));
        assert!(!qs.contains("channelId"));
        assert!(!qs.contains("notifications"));
    }

    #[test]
    fn query_string_includes_scope_and_notifications() {
        let mut s = scope();
        let channel = Uuid::new_v4();
        s.channel_id = Some(channel);
        s.notifications = true;

        let qs = s.query_string();
        assert!(qs.contains(&format!("channelId={channel}")));
        assert!(qs.contains("notifications=true"));
    }

    #[test]
    fn endpoint_joins_base_url_and_query() {
        let socket = ChatSocket::new("ws://localhost:8080/", "tok", scope());
        let endpoint = socket.endpoint();
        assert!(endpoint.starts_with("ws://localhost:8080/ws?"));
    }

    #[test]
    fn activity_command_builds_activity_frame() {
        let SocketCommand::Send(frame) = SocketCommand::activity() else {
            panic!("expected send command");
        };
        assert_eq!(frame["type"], "ACTIVITY");
    }

    #[test]
    fn typing_command_carries_scope_and_user() {
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();
        let SocketCommand::Send(frame) =
            SocketCommand::typing_in_channel(channel, None, user, "ada", true)
        else {
            panic!("expected send command");
        };
        assert_eq!(frame["type"], "TYPING");
        assert_eq!(frame["channelId"], json!(channel));
        assert_eq!(frame["user"]["name"], "ada");
        assert_eq!(frame["isTyping"], true);
        assert!(frame.get("threadId").is_none());
    }

    #[test]
    fn build_request_sets_bearer_header() {
        let socket = ChatSocket::new("ws://localhost:8080", "secret-token", scope());
        let request = socket.build_request().unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer secret-token"
        );
    }
}
