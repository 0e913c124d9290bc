use async_trait::async_trait;
use pollmcp_core::tools::{CallToolResult, Tool, ToolKind};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::DispatchError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    Failed(String),
}

/// The tools a server exposes. Implementations decide how each tool runs;
/// the invocation tracker only needs the classification up front.
#[async_trait]
pub trait ToolRegistry: Send + Sync + 'static {
    fn list(&self) -> Vec<Tool>;

    /// `None` for tools the registry does not know.
    fn classify(&self, name: &str) -> Option<ToolKind>;

    async fn invoke(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, ToolError>;
}
