use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pollmcp_core::error::{self, ApiError};
use pollmcp_core::protocol::{PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER};
use pollmcp_runtime::RuntimeError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Missing or mismatched `MCP-Protocol-Version` (400)
    ProtocolVersion { received: Option<String> },
    /// Acknowledgment for an id that is not outstanding (400)
    UnknownCorrelationId { header: &'static str, received: String },
    /// Unknown tool, prompt, resource or call id (404)
    NotFound { kind: &'static str, id: String },
    /// Long-running call id already in flight (409)
    Conflict { field: String, received: String },
    /// Internal error (500)
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, field: &str) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
            received: None,
            docs_hint: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::ProtocolVersion { received } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::PROTOCOL_VERSION_MISMATCH.to_string(),
                    message: match &received {
                        Some(version) => format!("Unsupported protocol version '{version}'"),
                        None => format!("Missing {PROTOCOL_VERSION_HEADER} header"),
                    },
                    field: Some(PROTOCOL_VERSION_HEADER.to_string()),
                    received: received.map(serde_json::Value::String),
                    request_id,
                    docs_hint: Some(format!(
                        "Send '{PROTOCOL_VERSION_HEADER}: {PROTOCOL_VERSION}' on every request."
                    )),
                },
            ),
            AppError::UnknownCorrelationId { header, received } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::UNKNOWN_CORRELATION_ID.to_string(),
                    message: format!("No outstanding item for {header} '{received}'"),
                    field: Some(header.to_string()),
                    received: Some(serde_json::Value::String(received)),
                    request_id,
                    docs_hint: Some(
                        "Ids are single-use. The item may already be answered, or it was never issued."
                            .to_string(),
                    ),
                },
            ),
            AppError::NotFound { kind, id } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("Unknown {kind} '{id}'"),
                    field: None,
                    received: Some(serde_json::Value::String(id)),
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Conflict { field, received } => (
                StatusCode::CONFLICT,
                ApiError {
                    error: error::codes::CONFLICT.to_string(),
                    message: format!("Call id '{received}' is already in flight"),
                    field: Some(field),
                    received: Some(serde_json::Value::String(received)),
                    request_id,
                    docs_hint: Some(
                        "Generate a fresh id per long-running call and poll the returned Location."
                            .to_string(),
                    ),
                },
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::UnknownTool(name) => AppError::NotFound {
                kind: "tool",
                id: name,
            },
            RuntimeError::MissingCallId { tool } => AppError::Validation {
                message: format!("Tool '{tool}' is long-running and needs a call id"),
                field: Some(pollmcp_core::protocol::REQUEST_ID_HEADER.to_string()),
                received: None,
                docs_hint: Some(
                    "Generate a unique id and send it as Mcp-Request-Id, then poll the Location header."
                        .to_string(),
                ),
            },
            RuntimeError::InvalidCallId { call_id } => AppError::Validation {
                message: format!("Call id '{call_id}' cannot be used in a status URL"),
                field: Some(pollmcp_core::protocol::REQUEST_ID_HEADER.to_string()),
                received: Some(serde_json::Value::String(call_id)),
                docs_hint: Some(
                    "Use only letters, digits, '-', '.', '_' and '~', e.g. a UUID.".to_string(),
                ),
            },
            RuntimeError::DuplicateInvocation { call_id } => AppError::Conflict {
                field: pollmcp_core::protocol::REQUEST_ID_HEADER.to_string(),
                received: call_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, ApiError) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).expect("body should be an ApiError");
        (status, body)
    }

    #[tokio::test]
    async fn runtime_errors_map_to_transport_statuses() {
        let (status, body) = body_of(RuntimeError::UnknownTool("nope".to_string()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "not_found");

        let (status, body) = body_of(
            RuntimeError::MissingCallId {
                tool: "getWeatherForecast".to_string(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.field.as_deref(), Some("Mcp-Request-Id"));

        let (status, body) = body_of(
            RuntimeError::DuplicateInvocation {
                call_id: "c-1".to_string(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.received, Some(serde_json::json!("c-1")));
    }

    #[tokio::test]
    async fn internal_errors_hide_the_cause() {
        let (status, body) = body_of(AppError::Internal(
            "tool 'getWeatherForecast' did not complete: task panicked".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "internal_error");
        assert_eq!(body.message, "An internal error occurred");
        assert!(body.received.is_none());
    }

    #[tokio::test]
    async fn unusable_call_id_is_a_validation_error() {
        let (status, body) = body_of(
            RuntimeError::InvalidCallId {
                call_id: "job/1".to_string(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "validation_failed");
        assert_eq!(body.received, Some(serde_json::json!("job/1")));
    }

    #[tokio::test]
    async fn protocol_version_error_names_the_header() {
        let (status, body) = body_of(AppError::ProtocolVersion {
            received: Some("2024-11-05".to_string()),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "protocol_version_mismatch");
        assert_eq!(body.field.as_deref(), Some("MCP-Protocol-Version"));
        assert!(!body.request_id.is_empty());
    }
}
