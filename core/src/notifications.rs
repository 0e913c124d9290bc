//! Notification kinds exchanged over `/notifications`.
//!
//! On the wire every notification is a `{ "method", "params" }` object.
//! Both directions are closed sets of known kinds plus an `Unknown` variant,
//! which receivers log and drop instead of failing the whole batch.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub mod methods {
    pub const CANCELLED: &str = "notifications/cancelled";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const MESSAGE: &str = "notifications/message";
    pub const PROGRESS: &str = "notifications/progress";
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    pub const RESOURCES_UPDATED: &str = "notifications/resources/updated";
    pub const ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
}

/// Untyped notification as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationEnvelope {
    /// Notification kind, e.g. "notifications/progress"
    pub method: String,
    /// Kind-specific parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl NotificationEnvelope {
    fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            method: method.to_string(),
            params,
        }
    }

    fn typed_params<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(params)
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelledParams {
    /// Id of the request being cancelled (string or number)
    pub request_id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoggingMessageParams {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    /// Token from the originating request, used to correlate updates
    pub progress_token: Value,
    /// Progress so far; increases monotonically for one token
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResourceUpdatedParams {
    pub uri: String,
}

/// Notifications the server pushes to the polling client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerNotification {
    Cancelled(CancelledParams),
    LoggingMessage(LoggingMessageParams),
    Progress(ProgressParams),
    PromptListChanged,
    ResourceListChanged,
    ResourceUpdated(ResourceUpdatedParams),
    ToolListChanged,
    Unknown { method: String },
}

impl ServerNotification {
    pub fn method(&self) -> &str {
        match self {
            Self::Cancelled(_) => methods::CANCELLED,
            Self::LoggingMessage(_) => methods::MESSAGE,
            Self::Progress(_) => methods::PROGRESS,
            Self::PromptListChanged => methods::PROMPTS_LIST_CHANGED,
            Self::ResourceListChanged => methods::RESOURCES_LIST_CHANGED,
            Self::ResourceUpdated(_) => methods::RESOURCES_UPDATED,
            Self::ToolListChanged => methods::TOOLS_LIST_CHANGED,
            Self::Unknown { method } => method,
        }
    }

    pub fn to_envelope(&self) -> NotificationEnvelope {
        let params = match self {
            Self::Cancelled(p) => serde_json::to_value(p).ok(),
            Self::LoggingMessage(p) => serde_json::to_value(p).ok(),
            Self::Progress(p) => serde_json::to_value(p).ok(),
            Self::ResourceUpdated(p) => serde_json::to_value(p).ok(),
            Self::PromptListChanged
            | Self::ResourceListChanged
            | Self::ToolListChanged
            | Self::Unknown { .. } => None,
        };
        NotificationEnvelope::new(self.method(), params)
    }

    /// Parse a raw notification. Unknown kinds are not an error; a known kind
    /// with malformed params is.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let envelope: NotificationEnvelope = serde_json::from_value(value)?;
        Ok(match envelope.method.as_str() {
            methods::CANCELLED => Self::Cancelled(envelope.typed_params()?),
            methods::MESSAGE => Self::LoggingMessage(envelope.typed_params()?),
            methods::PROGRESS => Self::Progress(envelope.typed_params()?),
            methods::PROMPTS_LIST_CHANGED => Self::PromptListChanged,
            methods::RESOURCES_LIST_CHANGED => Self::ResourceListChanged,
            methods::RESOURCES_UPDATED => Self::ResourceUpdated(envelope.typed_params()?),
            methods::TOOLS_LIST_CHANGED => Self::ToolListChanged,
            _ => Self::Unknown {
                method: envelope.method,
            },
        })
    }
}

impl From<ServerNotification> for Value {
    fn from(notification: ServerNotification) -> Self {
        notification.to_envelope().into_value()
    }
}

/// Fire-and-forget notifications the client sends alongside an acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotification {
    Cancelled(CancelledParams),
    Initialized,
    Progress(ProgressParams),
    RootsListChanged,
    Unknown { method: String },
}

impl ClientNotification {
    pub fn method(&self) -> &str {
        match self {
            Self::Cancelled(_) => methods::CANCELLED,
            Self::Initialized => methods::INITIALIZED,
            Self::Progress(_) => methods::PROGRESS,
            Self::RootsListChanged => methods::ROOTS_LIST_CHANGED,
            Self::Unknown { method } => method,
        }
    }

    pub fn to_envelope(&self) -> NotificationEnvelope {
        let params = match self {
            Self::Cancelled(p) => serde_json::to_value(p).ok(),
            Self::Progress(p) => serde_json::to_value(p).ok(),
            Self::Initialized | Self::RootsListChanged | Self::Unknown { .. } => None,
        };
        NotificationEnvelope::new(self.method(), params)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let envelope: NotificationEnvelope = serde_json::from_value(value)?;
        Ok(match envelope.method.as_str() {
            methods::CANCELLED => Self::Cancelled(envelope.typed_params()?),
            methods::INITIALIZED => Self::Initialized,
            methods::PROGRESS => Self::Progress(envelope.typed_params()?),
            methods::ROOTS_LIST_CHANGED => Self::RootsListChanged,
            _ => Self::Unknown {
                method: envelope.method,
            },
        })
    }
}

impl From<ClientNotification> for Value {
    fn from(notification: ClientNotification) -> Self {
        notification.to_envelope().into_value()
    }
}
