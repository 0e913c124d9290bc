use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::{get, post}};
use pollmcp_core::error::ApiError;
use pollmcp_core::protocol::REQUEST_ID_HEADER;
use pollmcp_core::requests::RequestEnvelope;
use serde_json::Value;

use crate::error::AppError;
use crate::extract::{header_str, optional_json, parse_correlation_id};
use crate::routes::ProtocolVersionHeader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", get(poll_request))
        .route("/responses", post(post_response))
}

/// Claim the next server-initiated request
///
/// Exactly one request per call. 204 when nothing is waiting, unlike
/// `/notifications`, which always answers 200.
#[utoipa::path(
    get,
    path = "/requests",
    params(ProtocolVersionHeader),
    responses(
        (status = 200, description = "One server request", body = RequestEnvelope,
            headers(("Mcp-Request-Id" = String, description = "Lease id to answer with on POST /responses"))),
        (status = 204, description = "No request waiting"),
        (status = 400, description = "Protocol version missing or unsupported", body = ApiError)
    ),
    tag = "requests"
)]
pub async fn poll_request(State(state): State<AppState>) -> Response {
    match state.requests.poll() {
        Some(claimed) => (
            [(REQUEST_ID_HEADER, claimed.request_id.to_string())],
            Json(claimed.request),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Answer a server request
///
/// The first answer for any lease of a request wins; later answers are
/// rejected with 400.
#[utoipa::path(
    post,
    path = "/responses",
    params(
        ProtocolVersionHeader,
        ("Mcp-Request-Id" = String, Header, description = "Lease id from GET /requests")
    ),
    request_body(content = Object, description = "Result for the request"),
    responses(
        (status = 202, description = "Answer accepted"),
        (status = 400, description = "Missing or unknown request id", body = ApiError)
    ),
    tag = "requests"
)]
pub async fn post_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let raw = header_str(&headers, REQUEST_ID_HEADER).ok_or_else(|| {
        AppError::validation(format!("Missing {REQUEST_ID_HEADER} header"), REQUEST_ID_HEADER)
    })?;
    let request_id = parse_correlation_id(REQUEST_ID_HEADER, raw)?;
    let result: Value = optional_json(&body)?;

    if !state.requests.resolve(request_id, result) {
        return Err(AppError::UnknownCorrelationId {
            header: REQUEST_ID_HEADER,
            received: raw.to_string(),
        });
    }
    Ok(StatusCode::ACCEPTED)
}
