//! Presence query handler.
//!
//! The presence view is a synchronous in-memory read over the tracker;
//! there is no network hop and no caching beyond the tracker itself, so
//! staleness is bounded by the away-timeout window.

use axum::Json;
use axum::extract::{Path, State};

use huddle_core::types::id::OrganizationId;

use crate::dto::response::{ApiResponse, PresenceResponse};
use crate::state::AppState;

/// GET /api/organizations/{org_id}/presence
pub async fn organization_presence(
    State(state): State<AppState>,
    Path(org_id): Path<OrganizationId>,
) -> Json<ApiResponse<PresenceResponse>> {
    let presence = state.engine.presence().snapshot(org_id);
    Json(ApiResponse::ok(PresenceResponse {
        organization_id: org_id,
        presence,
    }))
}
