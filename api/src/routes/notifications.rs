use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use pollmcp_core::error::ApiError;
use pollmcp_core::notifications::{ClientNotification, NotificationEnvelope};
use pollmcp_core::protocol::GROUP_ID_HEADER;
use serde_json::Value;

use crate::error::AppError;
use crate::extract::{header_str, optional_json, parse_correlation_id};
use crate::routes::ProtocolVersionHeader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/notifications",
        get(poll_notifications).post(post_notifications),
    )
}

/// Claim the next notification group
///
/// Returns everything buffered since the previous poll as one group, or an
/// expired group being redelivered. An empty array (still 200) means there is
/// nothing to deliver.
#[utoipa::path(
    get,
    path = "/notifications",
    params(ProtocolVersionHeader),
    responses(
        (status = 200, description = "Notification group, possibly empty", body = [NotificationEnvelope],
            headers(("Mcp-Group-Id" = String, description = "Lease id to acknowledge; absent when the array is empty"))),
        (status = 400, description = "Protocol version missing or unsupported", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn poll_notifications(State(state): State<AppState>) -> Response {
    match state.notifications.poll() {
        Some(group) => (
            [(GROUP_ID_HEADER, group.group_id.to_string())],
            Json(group.notifications),
        )
            .into_response(),
        None => Json(Vec::<Value>::new()).into_response(),
    }
}

/// Acknowledge a group and/or send client notifications
///
/// With `Mcp-Group-Id` the named group is completed. The body, if any, is an
/// array of client notifications; unknown or malformed entries are dropped.
#[utoipa::path(
    post,
    path = "/notifications",
    params(
        ProtocolVersionHeader,
        ("Mcp-Group-Id" = Option<String>, Header, description = "Group to acknowledge")
    ),
    request_body(content = [NotificationEnvelope], description = "Client notifications (optional)"),
    responses(
        (status = 202, description = "Accepted"),
        (status = 400, description = "Unknown group id, malformed body or bad protocol version", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn post_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let incoming: Vec<Value> = optional_json(&body)?;

    if let Some(raw) = header_str(&headers, GROUP_ID_HEADER) {
        let group_id = parse_correlation_id(GROUP_ID_HEADER, raw)?;
        if !state.notifications.acknowledge(group_id) {
            return Err(AppError::UnknownCorrelationId {
                header: GROUP_ID_HEADER,
                received: raw.to_string(),
            });
        }
        tracing::debug!(group_id = %group_id, "notification group acknowledged");
    }

    for notification in state.notifications.receive(incoming) {
        handle_client_notification(&state, notification);
    }
    Ok(StatusCode::ACCEPTED)
}

fn handle_client_notification(state: &AppState, notification: ClientNotification) {
    match notification {
        ClientNotification::Cancelled(params) => {
            if !state.requests.cancel(&params.request_id, params.reason) {
                tracing::debug!(request_id = %params.request_id, "cancellation for unknown request ignored");
            }
        }
        ClientNotification::Initialized => tracing::info!("client initialized"),
        ClientNotification::Progress(params) => tracing::debug!(
            progress_token = %params.progress_token,
            progress = params.progress,
            total = ?params.total,
            "client progress"
        ),
        ClientNotification::RootsListChanged => tracing::info!("client roots changed"),
        // already logged and filtered by `NotificationDispatcher::receive`
        ClientNotification::Unknown { .. } => {}
    }
}
