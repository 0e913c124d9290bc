use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Implementation {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub protocol_version: String,
    pub client_info: Implementation,
    #[serde(default)]
    pub capabilities: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: Value,
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Log levels accepted by `POST /logLevel`.
pub const LOG_LEVELS: [&str; 12] = [
    "trace",
    "debug",
    "info",
    "notice",
    "warning",
    "warn",
    "error",
    "critical",
    "alert",
    "emergency",
    "fatal",
    "off",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LogLevelRequest {
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LogLevelResponse {
    pub level: String,
}

/// Lowercase and validate a requested level; `None` when it is not recognised.
pub fn normalize_log_level(raw: &str) -> Option<String> {
    let level = raw.trim().to_ascii_lowercase();
    LOG_LEVELS.contains(&level.as_str()).then_some(level)
}

#[cfg(test)]
mod tests {
    use super::normalize_log_level;

    #[test]
    fn log_level_is_case_insensitive_and_validated() {
        assert_eq!(normalize_log_level(" DEBUG ").as_deref(), Some("debug"));
        assert_eq!(normalize_log_level("warning").as_deref(), Some("warning"));
        assert_eq!(normalize_log_level("loud"), None);
        assert_eq!(normalize_log_level(""), None);
    }
}
