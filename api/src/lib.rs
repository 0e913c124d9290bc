//! HTTP-polling MCP server.
//!
//! All server-to-client traffic is pulled: clients poll `/notifications`,
//! `/requests` and long-running tool status URLs, and acknowledge with the
//! correlation headers they were handed.

use axum::Router;
use pollmcp_core::protocol::PROTOCOL_VERSION;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod mocks;
pub mod routes;
pub mod state;

use crate::config::ServerConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pollmcp",
        version = "0.1.0",
        description = "MCP over plain request/response HTTP. The server never pushes; clients poll."
    ),
    paths(
        routes::health::health_check,
        routes::session::initialize,
        routes::session::ping,
        routes::session::get_log_level,
        routes::session::set_log_level,
        routes::notifications::poll_notifications,
        routes::notifications::post_notifications,
        routes::requests::poll_request,
        routes::requests::post_response,
        routes::tools::list_tools,
        routes::tools::call_tool,
        routes::tools::tool_call_status,
        routes::resources::list_resources,
        routes::resources::read_resource,
        routes::resources::subscribe,
        routes::resources::unsubscribe,
        routes::resources::list_templates,
        routes::prompts::list_prompts,
        routes::prompts::get_prompt,
        routes::completions::create_completion,
    ),
    components(schemas(
        routes::health::HealthResponse,
        pollmcp_core::error::ApiError,
        pollmcp_core::notifications::NotificationEnvelope,
        pollmcp_core::requests::RequestEnvelope,
        pollmcp_core::session::Implementation,
        pollmcp_core::session::InitializeRequest,
        pollmcp_core::session::InitializeResult,
        pollmcp_core::session::LogLevelRequest,
        pollmcp_core::session::LogLevelResponse,
        pollmcp_core::tools::Tool,
        pollmcp_core::tools::ToolKind,
        pollmcp_core::tools::ToolAnnotations,
        pollmcp_core::tools::ListToolsResult,
        pollmcp_core::tools::CallToolRequest,
        pollmcp_core::tools::CallToolResult,
        pollmcp_core::tools::ContentBlock,
        pollmcp_core::tools::ToolCallAccepted,
        pollmcp_core::resources::Resource,
        pollmcp_core::resources::ListResourcesResult,
        pollmcp_core::resources::ResourceTemplate,
        pollmcp_core::resources::ListResourceTemplatesResult,
        pollmcp_core::resources::ResourceUriRequest,
        pollmcp_core::resources::ResourceContents,
        pollmcp_core::resources::ReadResourceResult,
        pollmcp_core::prompts::Prompt,
        pollmcp_core::prompts::PromptArgument,
        pollmcp_core::prompts::ListPromptsResult,
        pollmcp_core::prompts::GetPromptResult,
        pollmcp_core::prompts::PromptMessage,
        pollmcp_core::prompts::PromptContent,
        pollmcp_core::completions::CompletionChoice,
        pollmcp_core::completions::CompletionUsage,
        pollmcp_core::completions::CompletionResult,
    )),
    modifiers(&ProtocolAddon)
)]
pub struct ApiDoc;

struct ProtocolAddon;

impl utoipa::Modify for ProtocolAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let base = openapi.info.description.take().unwrap_or_default();
        openapi.info.description = Some(format!(
            "{base}\n\nSupported protocol version: `{PROTOCOL_VERSION}`. Every operation except \
             /health, /initialize and /ping must send it in the MCP-Protocol-Version header."
        ));
    }
}

/// Assemble the full application. Protocol-gated routes sit behind the
/// version check; health, session bootstrap, docs and internal helpers do not.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let gated = Router::new()
        .merge(routes::notifications::router())
        .merge(routes::requests::router())
        .merge(routes::tools::router())
        .merge(routes::resources::router())
        .merge(routes::prompts::router())
        .merge(routes::completions::router())
        .merge(routes::session::log_level_router())
        .route_layer(axum::middleware::from_fn(
            middleware::protocol_version::require_protocol_version,
        ));

    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::session::router())
        .merge(gated);

    if config.enable_internal_routes {
        app = app.merge(routes::internal::router());
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(middleware::cors::build_cors_layer(&config.cors_origins)),
    )
    .with_state(state)
}
