use axum::http::{HeaderName, HeaderValue, Method, header};
use pollmcp_core::protocol::{
    GROUP_ID_HEADER, PROTOCOL_VERSION_HEADER, REQUEST_ID_HEADER, SESSION_ID_HEADER,
};
use tower_http::cors::CorsLayer;

/// Build the CORS layer for browser-hosted polling clients.
///
/// The correlation headers must be both accepted and exposed, otherwise a
/// browser client cannot read `Mcp-Request-Id`, `Mcp-Group-Id` or `Location`.
pub fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    // from_bytes normalizes to lowercase
    let mcp_headers: Vec<HeaderName> = [
        PROTOCOL_VERSION_HEADER,
        REQUEST_ID_HEADER,
        GROUP_ID_HEADER,
        SESSION_ID_HEADER,
    ]
    .iter()
    .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
    .collect();

    let mut allowed = vec![header::CONTENT_TYPE];
    allowed.extend(mcp_headers.iter().cloned());
    let mut exposed = vec![header::LOCATION];
    exposed.extend(mcp_headers);

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed)
        .expose_headers(exposed)
        .max_age(std::time::Duration::from_secs(3600))
}
