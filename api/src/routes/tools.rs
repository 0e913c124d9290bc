use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::{get, post}};
use pollmcp_core::error::ApiError;
use pollmcp_core::protocol::{REQUEST_ID_HEADER, tool_status_path};
use pollmcp_core::tools::{CallToolRequest, CallToolResult, ListToolsResult, ToolCallAccepted};
use pollmcp_runtime::{InvocationStatus, InvokeOutcome};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::extract::{header_str, optional_json};
use crate::routes::ProtocolVersionHeader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}/calls", post(call_tool))
        .route("/tools/{name}/calls/{id}", get(tool_call_status))
}

/// List available tools
#[utoipa::path(
    get,
    path = "/tools",
    params(ProtocolVersionHeader),
    responses(
        (status = 200, description = "Tool catalogue with execution kinds", body = ListToolsResult),
        (status = 400, description = "Protocol version missing or unsupported", body = ApiError)
    ),
    tag = "tools"
)]
pub async fn list_tools(State(state): State<AppState>) -> Json<ListToolsResult> {
    let tools = state.invocations.registry().list();
    let mut meta = Map::new();
    meta.insert("totalTools".to_string(), Value::from(tools.len()));
    Json(ListToolsResult {
        tools,
        next_cursor: String::new(),
        meta,
    })
}

fn accepted(call_id: &str, location: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, location.to_string())],
        Json(ToolCallAccepted::processing(call_id, location)),
    )
        .into_response()
}

/// Invoke a tool
///
/// Standard tools answer inline with 200. Long-running tools need a
/// client-chosen `Mcp-Request-Id`, answer 202 and name the status URL in
/// `Location`.
#[utoipa::path(
    post,
    path = "/tools/{name}/calls",
    params(
        ProtocolVersionHeader,
        ("name" = String, Path, description = "Tool name"),
        ("Mcp-Request-Id" = Option<String>, Header, description = "Call id; required for long-running tools")
    ),
    request_body(content = CallToolRequest, description = "Tool arguments (optional)"),
    responses(
        (status = 200, description = "Standard tool result; failures carry isError=true", body = CallToolResult),
        (status = 202, description = "Long-running call started", body = ToolCallAccepted,
            headers(("Location" = String, description = "Status URL to poll"))),
        (status = 400, description = "Missing or unusable call id for a long-running tool, or malformed body", body = ApiError),
        (status = 404, description = "Unknown tool", body = ApiError),
        (status = 409, description = "Call id already in flight", body = ApiError)
    ),
    tag = "tools"
)]
pub async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: CallToolRequest = optional_json(&body)?;
    let call_id = header_str(&headers, REQUEST_ID_HEADER);

    match state
        .invocations
        .invoke(&name, call_id, request.arguments)
        .await?
    {
        InvokeOutcome::Completed(result) => Ok(Json(result).into_response()),
        InvokeOutcome::Accepted {
            call_id,
            status_path,
        } => Ok(accepted(&call_id, &status_path)),
    }
}

/// Poll a long-running tool call
///
/// 202 while the call runs. Once finished the result is returned with 200
/// exactly once; the call id is forgotten afterwards and further polls get 404.
#[utoipa::path(
    get,
    path = "/tools/{name}/calls/{id}",
    params(
        ProtocolVersionHeader,
        ("name" = String, Path, description = "Tool name"),
        ("id" = String, Path, description = "Call id given when the call was started")
    ),
    responses(
        (status = 200, description = "Final result; failures carry isError=true", body = CallToolResult),
        (status = 202, description = "Still processing", body = ToolCallAccepted,
            headers(("Location" = String, description = "Same status URL"))),
        (status = 404, description = "Unknown or already retrieved call id", body = ApiError),
        (status = 500, description = "The task running the tool crashed; the call id is forgotten", body = ApiError)
    ),
    tag = "tools"
)]
pub async fn tool_call_status(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    match state.invocations.poll_status(&name, &id).await {
        None => Err(AppError::NotFound {
            kind: "tool call",
            id,
        }),
        Some(InvocationStatus::Running) => Ok(accepted(&id, &tool_status_path(&name, &id))),
        Some(InvocationStatus::Completed(result)) | Some(InvocationStatus::Failed(result)) => {
            Ok(Json(result).into_response())
        }
        Some(InvocationStatus::Crashed(reason)) => Err(AppError::Internal(reason)),
    }
}
