//! Integration tests for the WebSocket handshake authorization.

mod helpers;

use http::StatusCode;

use huddle_core::types::id::{ChannelId, OrganizationId, SessionId, UserId};

use helpers::{StaticAuth, StaticMembership, TestApp};

fn ws_path(
    user: UserId,
    org: OrganizationId,
    channel: Option<ChannelId>,
    session: Option<SessionId>,
    notifications: bool,
) -> String {
    let mut path = format!("/ws?userId={user}&organizationId={org}");
    if let Some(channel) = channel {
        path.push_str(&format!("&channelId={channel}"));
    }
    if let Some(session) = session {
        path.push_str(&format!("&sessionId={session}"));
    }
    if notifications {
        path.push_str("&notifications=true");
    }
    path
}

#[tokio::test]
async fn upgrade_without_token_is_unauthorized() {
    let user = UserId::new();
    let org = OrganizationId::new();
    let app = TestApp::new(
        StaticAuth::new(),
        StaticMembership::new().with_org_member(org, user),
    );

    let response = app.ws_request(&ws_path(user, org, None, None, false), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upgrade_with_unknown_token_is_unauthorized() {
    let user = UserId::new();
    let org = OrganizationId::new();
    let app = TestApp::new(
        StaticAuth::new().grant("good", user, "ada"),
        StaticMembership::new().with_org_member(org, user),
    );

    let response = app
        .ws_request(&ws_path(user, org, None, None, false), Some("bad"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_must_match_the_user_id_parameter() {
    let user = UserId::new();
    let impostor = UserId::new();
    let org = OrganizationId::new();
    let app = TestApp::new(
        StaticAuth::new().grant("tok", user, "ada"),
        StaticMembership::new()
            .with_org_member(org, user)
            .with_org_member(org, impostor),
    );

    let response = app
        .ws_request(&ws_path(impostor, org, None, None, false), Some("tok"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_org_member_is_forbidden() {
    let user = UserId::new();
    let org = OrganizationId::new();
    let app = TestApp::new(
        StaticAuth::new().grant("tok", user, "ada"),
        StaticMembership::new(),
    );

    let response = app
        .ws_request(&ws_path(user, org, None, None, false), Some("tok"))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn channel_scope_requires_channel_membership() {
    let user = UserId::new();
    let org = OrganizationId::new();
    let channel = ChannelId::new();
    let app = TestApp::new(
        StaticAuth::new().grant("tok", user, "ada"),
        StaticMembership::new().with_org_member(org, user),
    );

    let response = app
        .ws_request(&ws_path(user, org, Some(channel), None, false), Some("tok"))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn session_scope_requires_participation() {
    let user = UserId::new();
    let org = OrganizationId::new();
    let session = SessionId::new();
    let app = TestApp::new(
        StaticAuth::new().grant("tok", user, "ada"),
        StaticMembership::new().with_org_member(org, user),
    );

    let response = app
        .ws_request(&ws_path(user, org, None, Some(session), false), Some("tok"))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn authorized_channel_member_switches_protocols() {
    let user = UserId::new();
    let org = OrganizationId::new();
    let channel = ChannelId::new();
    let app = TestApp::new(
        StaticAuth::new().grant("tok", user, "ada"),
        StaticMembership::new().with_channel_member(org, channel, user),
    );

    let response = app
        .ws_request(&ws_path(user, org, Some(channel), None, true), Some("tok"))
        .await;
    assert_eq!(response.status, StatusCode::SWITCHING_PROTOCOLS);
}

#[tokio::test]
async fn health_check_works_without_database() {
    let app = TestApp::new(StaticAuth::new(), StaticMembership::new());

    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn presence_endpoint_returns_empty_view_for_idle_org() {
    let app = TestApp::new(StaticAuth::new(), StaticMembership::new());
    let org = OrganizationId::new();

    let response = app
        .request("GET", &format!("/api/organizations/{org}/presence"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["organizationId"], org.to_string());
    assert!(
        response.body["data"]["presence"]
            .as_object()
            .unwrap()
            .is_empty()
    );
}
