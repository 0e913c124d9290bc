use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Server requests not yet answered (active or leased)
    pub outstanding_requests: usize,
    /// Notification groups handed out but not acknowledged
    pub outstanding_notification_groups: usize,
    /// Notifications buffered and not yet polled
    pub buffered_notifications: usize,
    /// Long-running tool calls whose result has not been retrieved
    pub outstanding_tool_calls: usize,
}

/// Liveness plus a snapshot of the dispatch queues. Not protocol-gated.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        outstanding_requests: state.requests.outstanding(),
        outstanding_notification_groups: state.notifications.outstanding_groups(),
        buffered_notifications: state.notifications.buffered_len(),
        outstanding_tool_calls: state.invocations.outstanding(),
    })
}
