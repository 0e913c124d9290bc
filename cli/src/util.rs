use pollmcp_core::error::ApiError;
use serde_json::{Map, Value, json};

/// Everything a CLI command or the poller can fail with.
///
/// Exit codes: 0=success, 1=client error (4xx), 2=server error (5xx) or
/// unexpected response, 3=connection error, 4=usage error
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid server URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("could not reach the server: {0}")]
    Connection(#[source] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: Value,
    },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("{0}")]
    Usage(String),
    #[error("poller stopped before the call finished")]
    PollerStopped,
}

impl CliError {
    /// Build from a non-success status and whatever body came with it.
    pub fn from_status(status: u16, body: Value) -> Self {
        let message = serde_json::from_value::<ApiError>(body.clone())
            .map(|api| api.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        CliError::Api {
            status,
            message,
            body,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Api { status, .. } if (400..500).contains(status) => 1,
            CliError::Api { .. } | CliError::Decode(_) | CliError::PollerStopped => 2,
            CliError::Connection(_) => 3,
            CliError::InvalidUrl { .. } | CliError::Usage(_) => 4,
        }
    }

    /// Status code of an API error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CliError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CliError::Api { body, .. } if body.get("error").is_some() => body.clone(),
            CliError::Connection(_) => json!({
                "error": "connection_error",
                "message": self.to_string(),
                "docs_hint": "Is the server running? Check --server-url or POLLMCP_SERVER_URL."
            }),
            _ => json!({
                "error": "cli_error",
                "message": self.to_string()
            }),
        }
    }
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", pretty(&err));
    std::process::exit(4);
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Print a command outcome and turn it into the process exit code.
pub fn finish(result: Result<Value, CliError>) -> i32 {
    match result {
        Ok(value) => {
            println!("{}", pretty(&value));
            0
        }
        Err(err) => {
            eprintln!("{}", pretty(&err.to_json()));
            err.exit_code()
        }
    }
}

/// Parse a `--args` style JSON object. Absent means an empty map.
pub fn parse_json_object(flag: &str, raw: Option<&str>) -> Result<Map<String, Value>, CliError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CliError::Usage(format!(
            "{flag} must be a JSON object, got: {other}"
        ))),
        Err(e) => Err(CliError::Usage(format!("Invalid JSON in {flag}: {e}"))),
    }
}
