use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pollmcp_core::protocol::{PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, is_supported_version};

use crate::error::AppError;

/// Reject requests that do not declare exactly the supported protocol version.
/// Runs before any handler, so rejected traffic never touches dispatch state.
/// Admitted responses echo the version back.
pub async fn require_protocol_version(req: Request, next: Next) -> Response {
    let declared = req
        .headers()
        .get(PROTOCOL_VERSION_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    if !is_supported_version(declared.as_deref()) {
        tracing::debug!(
            path = %req.uri().path(),
            declared = declared.as_deref().unwrap_or("<missing>"),
            "rejected request with unsupported protocol version"
        );
        return AppError::ProtocolVersion { received: declared }.into_response();
    }

    let mut response = next.run(req).await;
    response.headers_mut().insert(
        HeaderName::from_static("mcp-protocol-version"),
        HeaderValue::from_static(PROTOCOL_VERSION),
    );
    response
}
