use async_trait::async_trait;
use pollmcp_core::requests::{
    ElicitAction, ElicitParams, ElicitResult, ListRootsResult, PrimitiveSchema, ServerRequest,
    error_result,
};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

/// Answers server-initiated requests on behalf of the client.
///
/// The returned value is posted verbatim to `/responses`.
#[async_trait]
pub trait ServerRequestHandler: Send + Sync {
    async fn handle(&self, request: ServerRequest) -> Value;
}

/// Handler used by the CLI: answers pings and root listings itself, asks the
/// user for elicitations when stdin is a terminal, declines otherwise.
pub struct DefaultRequestHandler {
    stdin: Option<Mutex<Lines<BufReader<Stdin>>>>,
}

impl DefaultRequestHandler {
    pub fn new(interactive: bool) -> Self {
        Self {
            stdin: interactive
                .then(|| Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
        }
    }

    pub fn non_interactive() -> Self {
        Self::new(false)
    }

    async fn elicit(&self, params: ElicitParams) -> ElicitResult {
        let Some(stdin) = &self.stdin else {
            tracing::info!(message = %params.message, "declining elicitation, no terminal attached");
            return ElicitResult::declined();
        };
        let mut lines = stdin.lock().await;

        eprintln!("{}", params.message);
        let mut content = Map::new();
        for (field, schema) in &params.requested_schema.properties {
            match schema.description() {
                Some(description) => eprint!("{field} ({description}): "),
                None => eprint!("{field}: "),
            }
            let raw = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return ElicitResult::declined(),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read elicitation answer");
                    return cancelled();
                }
            };
            if raw.trim().is_empty() {
                return ElicitResult::declined();
            }
            match coerce_answer(schema, &raw) {
                Some(value) => {
                    content.insert(field.clone(), value);
                }
                None => {
                    eprintln!("'{}' is not a valid answer for {field}", raw.trim());
                    return cancelled();
                }
            }
        }

        ElicitResult {
            action: ElicitAction::Accept,
            content: Some(content),
        }
    }
}

fn cancelled() -> ElicitResult {
    ElicitResult {
        action: ElicitAction::Cancel,
        content: None,
    }
}

/// Convert typed-in text to the JSON type a schema property asks for.
pub fn coerce_answer(schema: &PrimitiveSchema, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    match schema {
        PrimitiveSchema::String {
            min_length,
            max_length,
            ..
        } => {
            let len = raw.chars().count() as u32;
            let fits = min_length.is_none_or(|min| len >= min)
                && max_length.is_none_or(|max| len <= max);
            fits.then(|| Value::String(raw.to_string()))
        }
        PrimitiveSchema::Integer {
            minimum, maximum, ..
        } => {
            let n: i64 = raw.parse().ok()?;
            let fits = minimum.is_none_or(|min| n >= min) && maximum.is_none_or(|max| n <= max);
            fits.then(|| json!(n))
        }
        PrimitiveSchema::Number {
            minimum, maximum, ..
        } => {
            let n: f64 = raw.parse().ok()?;
            let fits = minimum.is_none_or(|min| n >= min) && maximum.is_none_or(|max| n <= max);
            fits.then(|| json!(n))
        }
        PrimitiveSchema::Boolean { .. } => match raw.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" => Some(Value::Bool(true)),
            "n" | "no" | "false" => Some(Value::Bool(false)),
            _ => None,
        },
    }
}

#[async_trait]
impl ServerRequestHandler for DefaultRequestHandler {
    async fn handle(&self, request: ServerRequest) -> Value {
        match request {
            ServerRequest::Ping => json!({}),
            ServerRequest::ListRoots => {
                serde_json::to_value(ListRootsResult { roots: Vec::new() }).unwrap_or(Value::Null)
            }
            ServerRequest::Elicit(params) => {
                serde_json::to_value(self.elicit(params).await).unwrap_or(Value::Null)
            }
            ServerRequest::CreateMessage(_) => {
                error_result(METHOD_NOT_FOUND, "sampling is not supported by this client")
            }
            ServerRequest::Unknown { method } => {
                tracing::warn!(method = %method, "unknown server request");
                error_result(METHOD_NOT_FOUND, &format!("unsupported method '{method}'"))
            }
        }
    }
}
