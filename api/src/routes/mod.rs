pub mod completions;
pub mod health;
pub mod internal;
pub mod notifications;
pub mod prompts;
pub mod requests;
pub mod resources;
pub mod session;
pub mod tools;

use utoipa::IntoParams;

/// Header every gated operation must carry.
#[derive(IntoParams)]
#[into_params(parameter_in = Header)]
pub struct ProtocolVersionHeader {
    /// Must equal the supported protocol version exactly
    #[param(rename = "MCP-Protocol-Version", example = "2025-06-18")]
    pub version: String,
}
