use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::{Json, Router, routing::{get, post}};
use pollmcp_core::error::ApiError;
use pollmcp_core::prompts::{GetPromptResult, ListPromptsResult};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::extract::optional_json;
use crate::routes::ProtocolVersionHeader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prompts", get(list_prompts))
        .route("/prompts/{name}", post(get_prompt))
}

/// List prompts
#[utoipa::path(
    get,
    path = "/prompts",
    params(ProtocolVersionHeader),
    responses((status = 200, description = "Available prompts", body = ListPromptsResult)),
    tag = "prompts"
)]
pub async fn list_prompts(State(state): State<AppState>) -> Json<ListPromptsResult> {
    Json(ListPromptsResult {
        prompts: state.prompts.list(),
    })
}

/// Render a prompt
///
/// The body maps argument names to values; each replaces its `{{name}}`
/// placeholder.
#[utoipa::path(
    post,
    path = "/prompts/{name}",
    params(ProtocolVersionHeader, ("name" = String, Path, description = "Prompt name")),
    request_body(content = Object, description = "Prompt arguments (optional)"),
    responses(
        (status = 200, description = "Rendered prompt", body = GetPromptResult),
        (status = 404, description = "Unknown prompt", body = ApiError)
    ),
    tag = "prompts"
)]
pub async fn get_prompt(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<GetPromptResult>, AppError> {
    let arguments: Map<String, Value> = optional_json(&body)?;
    state
        .prompts
        .render(&name, &arguments)
        .map(Json)
        .ok_or(AppError::NotFound {
            kind: "prompt",
            id: name,
        })
}
