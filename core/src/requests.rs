//! Server-initiated requests delivered through `/requests` and the results
//! clients post back to `/responses`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

pub mod methods {
    pub const PING: &str = "ping";
    pub const CREATE_MESSAGE: &str = "sampling/createMessage";
    pub const ELICIT: &str = "elicitation/create";
    pub const LIST_ROOTS: &str = "roots/list";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestEnvelope {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageParams {
    pub messages: Vec<Value>,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Restricted JSON schema for the fields an elicitation asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrimitiveSchema {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, rename = "minLength", skip_serializing_if = "Option::is_none")]
        min_length: Option<u32>,
        #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl PrimitiveSchema {
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::String { description, .. }
            | Self::Number { description, .. }
            | Self::Integer { description, .. }
            | Self::Boolean { description } => description.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ElicitSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PrimitiveSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn object_type() -> String {
    "object".to_string()
}

impl ElicitSchema {
    pub fn single(name: &str, schema: PrimitiveSchema) -> Self {
        Self {
            schema_type: object_type(),
            properties: BTreeMap::from([(name.to_string(), schema)]),
            required: vec![name.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElicitParams {
    pub message: String,
    pub requested_schema: ElicitSchema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ElicitAction {
    Accept,
    Decline,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ElicitResult {
    pub action: ElicitAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub content: Option<Map<String, Value>>,
}

impl ElicitResult {
    pub fn declined() -> Self {
        Self {
            action: ElicitAction::Decline,
            content: None,
        }
    }

    /// Accepted answer value for `field`, if the client accepted.
    pub fn accepted_field(&self, field: &str) -> Option<&Value> {
        match self.action {
            ElicitAction::Accept => self.content.as_ref()?.get(field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Root {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListRootsResult {
    pub roots: Vec<Root>,
}

/// Requests the server can issue to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerRequest {
    Ping,
    CreateMessage(CreateMessageParams),
    Elicit(ElicitParams),
    ListRoots,
    Unknown { method: String },
}

impl ServerRequest {
    pub fn method(&self) -> &str {
        match self {
            Self::Ping => methods::PING,
            Self::CreateMessage(_) => methods::CREATE_MESSAGE,
            Self::Elicit(_) => methods::ELICIT,
            Self::ListRoots => methods::LIST_ROOTS,
            Self::Unknown { method } => method,
        }
    }

    pub fn to_envelope(&self) -> RequestEnvelope {
        let params = match self {
            Self::CreateMessage(p) => serde_json::to_value(p).ok(),
            Self::Elicit(p) => serde_json::to_value(p).ok(),
            Self::Ping | Self::ListRoots | Self::Unknown { .. } => None,
        };
        RequestEnvelope {
            method: self.method().to_string(),
            params,
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let envelope: RequestEnvelope = serde_json::from_value(value)?;
        Ok(match envelope.method.as_str() {
            methods::PING => Self::Ping,
            methods::CREATE_MESSAGE => Self::CreateMessage(params_of(&envelope)?),
            methods::ELICIT => Self::Elicit(params_of(&envelope)?),
            methods::LIST_ROOTS => Self::ListRoots,
            _ => Self::Unknown {
                method: envelope.method,
            },
        })
    }
}

fn params_of<T: DeserializeOwned>(envelope: &RequestEnvelope) -> Result<T, serde_json::Error> {
    serde_json::from_value(envelope.params.clone().unwrap_or(Value::Null))
}

impl From<ServerRequest> for Value {
    fn from(request: ServerRequest) -> Self {
        serde_json::to_value(request.to_envelope()).unwrap_or(Value::Null)
    }
}

/// Result body for a request the client cannot or will not serve.
pub fn error_result(code: i64, message: &str) -> Value {
    json!({
        "isError": true,
        "error": { "code": code, "message": message }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elicit_request_round_trips_through_wire_form() {
        let request = ServerRequest::Elicit(ElicitParams {
            message: "What is your name?".to_string(),
            requested_schema: ElicitSchema::single(
                "name",
                PrimitiveSchema::String {
                    description: Some("Name of the player".to_string()),
                    min_length: Some(2),
                    max_length: Some(50),
                },
            ),
        });
        let value: Value = request.clone().into();
        assert_eq!(value["method"], "elicitation/create");
        assert_eq!(
            value["params"]["requestedSchema"]["properties"]["name"]["type"],
            "string"
        );
        assert_eq!(
            value["params"]["requestedSchema"]["properties"]["name"]["minLength"],
            2
        );
        assert_eq!(ServerRequest::from_value(value).unwrap(), request);
    }

    #[test]
    fn ping_has_no_params_and_unknown_is_preserved() {
        let value: Value = ServerRequest::Ping.into();
        assert_eq!(value, json!({ "method": "ping" }));
        assert_eq!(
            ServerRequest::from_value(json!({ "method": "custom/thing" })).unwrap(),
            ServerRequest::Unknown {
                method: "custom/thing".to_string()
            }
        );
    }

    #[test]
    fn accepted_field_ignores_declined_answers() {
        let accepted: ElicitResult = serde_json::from_value(json!({
            "action": "accept",
            "content": { "answer": true }
        }))
        .unwrap();
        assert_eq!(accepted.accepted_field("answer"), Some(&json!(true)));
        assert_eq!(ElicitResult::declined().accepted_field("answer"), None);
    }
}
