use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::{get, post}};
use pollmcp_core::error::ApiError;
use pollmcp_core::protocol::{
    PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, SERVER_NAME, SERVER_TITLE, SESSION_ID_HEADER,
};
use pollmcp_core::session::{
    Implementation, InitializeRequest, InitializeResult, LOG_LEVELS, LogLevelRequest,
    LogLevelResponse, normalize_log_level,
};
use serde_json::json;

use crate::error::AppError;
use crate::extract::optional_json;
use crate::routes::ProtocolVersionHeader;
use crate::state::AppState;

/// Routes reachable before a client knows the protocol version.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(initialize))
        .route("/ping", get(ping))
}

pub fn log_level_router() -> Router<AppState> {
    Router::new().route("/logLevel", get(get_log_level).post(set_log_level))
}

/// Start a session
///
/// Reports the protocol version the client must send on every gated call,
/// plus server capabilities. Not protocol-gated.
#[utoipa::path(
    post,
    path = "/initialize",
    request_body(content = InitializeRequest, description = "Client info and capabilities (optional)"),
    responses(
        (status = 200, description = "Server info", body = InitializeResult,
            headers(
                ("Mcp-Session-Id" = String, description = "Fresh session id"),
                ("MCP-Protocol-Version" = String, description = "Version to send on later calls")
            )),
        (status = 400, description = "Malformed body", body = ApiError)
    ),
    tag = "session"
)]
pub async fn initialize(body: Bytes) -> Result<impl IntoResponse, AppError> {
    let request: Option<InitializeRequest> = optional_json(&body)?;
    let session_id = uuid::Uuid::now_v7().to_string();

    match &request {
        Some(req) => tracing::info!(
            session_id = %session_id,
            client = %req.client_info.name,
            client_version = %req.client_info.version,
            requested_protocol = %req.protocol_version,
            "client initialized session"
        ),
        None => tracing::info!(session_id = %session_id, "anonymous session initialized"),
    }

    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: json!({
            "tools": { "listChanged": false },
            "prompts": { "listChanged": false },
            "resources": { "listChanged": false, "subscribe": true },
            "logging": {}
        }),
        server_info: Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some(SERVER_TITLE.to_string()),
        },
        instructions: Some(format!(
            "Send '{PROTOCOL_VERSION_HEADER}: {PROTOCOL_VERSION}' on every call. \
             Poll GET /requests and GET /notifications for server-initiated traffic."
        )),
    };

    Ok((
        [
            (SESSION_ID_HEADER, session_id),
            (PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION.to_string()),
        ],
        Json(result),
    ))
}

/// Liveness check on the protocol surface. Not protocol-gated.
#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 202, description = "Server is reachable")),
    tag = "session"
)]
pub async fn ping() -> StatusCode {
    StatusCode::ACCEPTED
}

/// Current log level
#[utoipa::path(
    get,
    path = "/logLevel",
    params(ProtocolVersionHeader),
    responses(
        (status = 200, description = "Current level", body = LogLevelResponse),
        (status = 400, description = "Protocol version missing or unsupported", body = ApiError)
    ),
    tag = "session"
)]
pub async fn get_log_level(State(state): State<AppState>) -> Json<LogLevelResponse> {
    Json(LogLevelResponse {
        level: state.log_level(),
    })
}

/// Set the log level for messages sent to the client
#[utoipa::path(
    post,
    path = "/logLevel",
    params(ProtocolVersionHeader),
    request_body = LogLevelRequest,
    responses(
        (status = 200, description = "Level applied", body = LogLevelResponse),
        (status = 400, description = "Missing or invalid level", body = ApiError)
    ),
    tag = "session"
)]
pub async fn set_log_level(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LogLevelResponse>, AppError> {
    let request: Option<LogLevelRequest> = optional_json(&body)?;
    let raw = request.and_then(|r| r.level).unwrap_or_default();
    let level = normalize_log_level(&raw).ok_or_else(|| AppError::Validation {
        message: if raw.trim().is_empty() {
            "Missing log level".to_string()
        } else {
            format!("Invalid log level '{raw}'")
        },
        field: Some("level".to_string()),
        received: (!raw.is_empty()).then(|| serde_json::Value::String(raw.clone())),
        docs_hint: Some(format!("Use one of: {}", LOG_LEVELS.join(", "))),
    })?;

    tracing::info!(level = %level, "client log level changed");
    state.set_log_level(level.clone());
    Ok(Json(LogLevelResponse { level }))
}
