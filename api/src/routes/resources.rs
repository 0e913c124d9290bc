use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::{get, post}};
use pollmcp_core::error::ApiError;
use pollmcp_core::resources::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceResult, ResourceUriRequest,
};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::routes::ProtocolVersionHeader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/resources", get(list_resources))
        .route("/resources/read", post(read_resource))
        .route("/resources/subscribe", post(subscribe))
        .route("/resources/unsubscribe", post(unsubscribe))
        .route("/resources/templates", get(list_templates))
}

/// List resources
#[utoipa::path(
    get,
    path = "/resources",
    params(ProtocolVersionHeader),
    responses((status = 200, description = "Known resources", body = ListResourcesResult)),
    tag = "resources"
)]
pub async fn list_resources(State(state): State<AppState>) -> Json<ListResourcesResult> {
    Json(ListResourcesResult {
        resources: state.resources.list(),
    })
}

/// Read a resource by URI
#[utoipa::path(
    post,
    path = "/resources/read",
    params(ProtocolVersionHeader),
    request_body = ResourceUriRequest,
    responses(
        (status = 200, description = "Resource contents", body = ReadResourceResult),
        (status = 404, description = "Unknown resource", body = ApiError)
    ),
    tag = "resources"
)]
pub async fn read_resource(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResourceUriRequest>,
) -> Result<Json<ReadResourceResult>, AppError> {
    let contents = state.resources.read(&req.uri).ok_or(AppError::NotFound {
        kind: "resource",
        id: req.uri,
    })?;
    Ok(Json(ReadResourceResult {
        contents: vec![contents],
    }))
}

/// Subscribe to change notifications for a resource
///
/// Updates arrive as `notifications/resources/updated` on GET /notifications.
#[utoipa::path(
    post,
    path = "/resources/subscribe",
    params(ProtocolVersionHeader),
    request_body = ResourceUriRequest,
    responses(
        (status = 202, description = "Subscribed"),
        (status = 404, description = "Unknown resource", body = ApiError)
    ),
    tag = "resources"
)]
pub async fn subscribe(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResourceUriRequest>,
) -> Result<StatusCode, AppError> {
    if !state.resources.subscribe(&req.uri) {
        return Err(AppError::NotFound {
            kind: "resource",
            id: req.uri,
        });
    }
    tracing::info!(uri = %req.uri, "resource subscribed");
    Ok(StatusCode::ACCEPTED)
}

/// Drop a resource subscription
#[utoipa::path(
    post,
    path = "/resources/unsubscribe",
    params(ProtocolVersionHeader),
    request_body = ResourceUriRequest,
    responses(
        (status = 202, description = "Unsubscribed"),
        (status = 404, description = "No subscription for this URI", body = ApiError)
    ),
    tag = "resources"
)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResourceUriRequest>,
) -> Result<StatusCode, AppError> {
    if !state.resources.unsubscribe(&req.uri) {
        return Err(AppError::NotFound {
            kind: "subscription",
            id: req.uri,
        });
    }
    tracing::info!(uri = %req.uri, "resource unsubscribed");
    Ok(StatusCode::ACCEPTED)
}

/// List resource URI templates
#[utoipa::path(
    get,
    path = "/resources/templates",
    params(ProtocolVersionHeader),
    responses((status = 200, description = "URI templates", body = ListResourceTemplatesResult)),
    tag = "resources"
)]
pub async fn list_templates(State(state): State<AppState>) -> Json<ListResourceTemplatesResult> {
    Json(ListResourceTemplatesResult {
        resource_templates: state.resources.templates(),
    })
}
