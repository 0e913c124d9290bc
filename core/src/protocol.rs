//! Protocol constants shared by the server and the client.
//!
//! Header names are part of the wire contract. HTTP header lookup is
//! case-insensitive, but the canonical spelling is kept here so that
//! responses and documentation reproduce it exactly.

/// The only protocol version the server accepts. No range or negotiation.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

pub const PROTOCOL_VERSION_HEADER: &str = "MCP-Protocol-Version";
pub const REQUEST_ID_HEADER: &str = "Mcp-Request-Id";
pub const GROUP_ID_HEADER: &str = "Mcp-Group-Id";
pub const SESSION_ID_HEADER: &str = "Mcp-Session-Id";

pub const SERVER_NAME: &str = "pollmcp-server";
pub const SERVER_TITLE: &str = "Pure HTTP MCP Server";

/// Call ids travel as a single path segment, so they are limited to the
/// RFC 3986 unreserved characters.
pub fn is_valid_call_id(call_id: &str) -> bool {
    !call_id.is_empty()
        && call_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

/// Build the status URL a long-running tool call is polled at.
pub fn tool_status_path(tool_name: &str, call_id: &str) -> String {
    format!("/tools/{tool_name}/calls/{call_id}")
}

/// Returns true when the declared version matches [`PROTOCOL_VERSION`] exactly.
pub fn is_supported_version(declared: Option<&str>) -> bool {
    declared == Some(PROTOCOL_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_path_embeds_tool_and_call_id() {
        assert_eq!(
            tool_status_path("getWeatherForecast", "abc-123"),
            "/tools/getWeatherForecast/calls/abc-123"
        );
    }

    #[test]
    fn call_ids_are_limited_to_unreserved_characters() {
        assert!(is_valid_call_id("call-42"));
        assert!(is_valid_call_id("0192d1c4-7b2e-7c3a.x_y~z"));
        for id in ["", "job/1", "a%20b", "q?x=1", "frag#1", "a b", "café"] {
            assert!(!is_valid_call_id(id), "{id:?} should be rejected");
        }
    }

    #[test]
    fn version_match_is_exact() {
        assert!(is_supported_version(Some("2025-06-18")));
        assert!(!is_supported_version(Some("2025-06-18 ")));
        assert!(!is_supported_version(Some("2024-11-05")));
        assert!(!is_supported_version(None));
    }
}
