use axum::body::Bytes;
use axum::{Json, Router, routing::post};
use pollmcp_core::completions::CompletionResult;
use pollmcp_core::error::ApiError;
use serde_json::Value;

use crate::error::AppError;
use crate::extract::optional_json;
use crate::routes::ProtocolVersionHeader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/completions", post(create_completion))
}

/// Create a completion (demo)
///
/// Any JSON body is accepted and the same canned completion comes back.
#[utoipa::path(
    post,
    path = "/completions",
    params(ProtocolVersionHeader),
    request_body(content = Object, description = "Completion request; contents are not inspected"),
    responses(
        (status = 200, description = "Canned completion", body = CompletionResult),
        (status = 400, description = "Missing or malformed body, or protocol version missing or unsupported", body = ApiError)
    ),
    tag = "completions"
)]
pub async fn create_completion(body: Bytes) -> Result<Json<CompletionResult>, AppError> {
    let request: Value = optional_json(&body)?;
    if request.is_null() {
        return Err(AppError::validation("Missing request body", "body"));
    }
    let result = CompletionResult::demo(uuid::Uuid::now_v7().to_string());
    tracing::debug!(completion_id = %result.id, "served demo completion");
    Ok(Json(result))
}
