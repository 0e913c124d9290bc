//! Helper routes for driving the transport by hand and from tests. Not
//! protocol-gated and not part of the published API document.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use pollmcp_runtime::ItemId;
use serde::Serialize;
use serde_json::Value;

use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/internal/notifications", post(enqueue_notifications))
        .route("/internal/requests", post(enqueue_request))
        .route("/internal/reactivate", post(force_reactivation))
}

#[derive(Serialize)]
pub struct QueuedResponse {
    pub queued: usize,
}

#[derive(Serialize)]
pub struct EnqueuedRequestResponse {
    pub id: ItemId,
}

#[derive(Serialize)]
pub struct ReactivatedResponse {
    pub reactivated: usize,
}

pub async fn enqueue_notifications(
    State(state): State<AppState>,
    AppJson(notifications): AppJson<Vec<Value>>,
) -> Json<QueuedResponse> {
    let queued = state.notifications.enqueue_batch(notifications);
    tracing::debug!(queued, "notifications enqueued through internal route");
    Json(QueuedResponse { queued })
}

pub async fn enqueue_request(
    State(state): State<AppState>,
    AppJson(request): AppJson<Value>,
) -> Json<EnqueuedRequestResponse> {
    Json(EnqueuedRequestResponse {
        id: state.requests.enqueue_detached(request),
    })
}

/// Run an expired-lease sweep on both queues now instead of waiting for the
/// timer.
pub async fn force_reactivation(State(state): State<AppState>) -> Json<ReactivatedResponse> {
    let reactivated =
        state.notifications.reactivate_expired() + state.requests.reactivate_expired();
    Json(ReactivatedResponse { reactivated })
}
