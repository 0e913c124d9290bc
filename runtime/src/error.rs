use std::time::Duration;

use thiserror::Error;

/// Failures of tool invocation bookkeeping.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("long-running tool '{tool}' requires a call id")]
    MissingCallId { tool: String },

    #[error("call id '{call_id}' may only contain letters, digits, '-', '.', '_' and '~'")]
    InvalidCallId { call_id: String },

    #[error("call id '{call_id}' is already in flight")]
    DuplicateInvocation { call_id: String },
}

/// Why a server-initiated request produced no usable client result.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request was withdrawn before the client answered")]
    Withdrawn,

    #[error("client cancelled the request: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Cancelled { reason: Option<String> },

    #[error("no client response within {}s", .after.as_secs())]
    TimedOut { after: Duration },

    #[error("client result for '{method}' did not match the expected shape: {source}")]
    UnexpectedResult {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}
