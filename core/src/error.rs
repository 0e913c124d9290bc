use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured problem body returned for every transport-facing error.
/// Carries enough information for a polling client to tell what went wrong
/// and how to correct the next request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "not_found")
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which field or header caused the error (if applicable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the transport
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const PROTOCOL_VERSION_MISMATCH: &str = "protocol_version_mismatch";
    pub const UNKNOWN_CORRELATION_ID: &str = "unknown_correlation_id";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
