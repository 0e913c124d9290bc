//! Typed HTTP client for the polling transport.
//!
//! Every call carries `MCP-Protocol-Version`. Non-success statuses become
//! [`CliError::Api`] with the server's problem body attached.

use std::time::Duration;

use pollmcp_core::prompts::{GetPromptResult, ListPromptsResult};
use pollmcp_core::protocol::{
    GROUP_ID_HEADER, PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, REQUEST_ID_HEADER,
    SESSION_ID_HEADER,
};
use pollmcp_core::resources::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceResult, ResourceUriRequest,
};
use pollmcp_core::session::{
    Implementation, InitializeRequest, InitializeResult, LogLevelRequest, LogLevelResponse,
};
use pollmcp_core::tools::{CallToolRequest, CallToolResult, ListToolsResult, ToolCallAccepted};
use reqwest::{Method, RequestBuilder, Response, StatusCode, header::LOCATION};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::util::CliError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of starting a tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallStart {
    /// Standard tool, answered inline
    Completed(CallToolResult),
    /// Long-running tool; poll `location` until it finishes
    Accepted(ToolCallAccepted),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolStatus {
    Running,
    Finished(CallToolResult),
}

/// One server-initiated request claimed from `GET /requests`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolledRequest {
    pub request_id: String,
    pub request: Value,
}

/// One notification group claimed from `GET /notifications`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationBatch {
    pub group_id: String,
    pub notifications: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct PollingClient {
    http: reqwest::Client,
    base_url: String,
}

impl PollingClient {
    pub fn new(server_url: &str) -> Result<Self, CliError> {
        let parsed = url::Url::parse(server_url).map_err(|source| CliError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(CliError::Usage(format!(
                "server URL must be an http(s) URL, got '{server_url}'"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(CliError::Connection)?;
        Ok(Self {
            http,
            base_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header(PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, CliError> {
        let response = builder.send().await.map_err(CliError::Connection)?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Err(CliError::from_status(status, body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CliError> {
        response
            .json::<T>()
            .await
            .map_err(|e| CliError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let response = self
            .send(self.request(Method::POST, path).json(body))
            .await?;
        Self::decode(response).await
    }

    async fn post_accepted<B: Serialize + ?Sized>(
        &self,
        builder: RequestBuilder,
        body: &B,
    ) -> Result<(), CliError> {
        self.send(builder.json(body)).await.map(|_| ())
    }

    pub async fn health(&self) -> Result<Value, CliError> {
        self.get_json("/health").await
    }

    /// Returns the server's answer plus the session id it minted.
    pub async fn initialize(
        &self,
        client_name: &str,
    ) -> Result<(InitializeResult, Option<String>), CliError> {
        let body = InitializeRequest {
            protocol_version: PROTOCOL_VERSION.to_string(),
            client_info: Implementation {
                name: client_name.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
            },
            capabilities: json!({ "elicitation": {}, "roots": { "listChanged": false } }),
        };
        let response = self
            .send(self.request(Method::POST, "/initialize").json(&body))
            .await?;
        let session_id = header_value(&response, SESSION_ID_HEADER);
        Ok((Self::decode(response).await?, session_id))
    }

    pub async fn ping(&self) -> Result<(), CliError> {
        self.send(self.request(Method::GET, "/ping")).await.map(|_| ())
    }

    pub async fn list_tools(&self) -> Result<ListToolsResult, CliError> {
        self.get_json("/tools").await
    }

    /// Start a tool call. Long-running tools need `call_id`.
    pub async fn start_tool_call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        call_id: Option<&str>,
    ) -> Result<ToolCallStart, CliError> {
        let mut builder = self
            .request(Method::POST, &format!("/tools/{name}/calls"))
            .json(&CallToolRequest { arguments });
        if let Some(id) = call_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        let response = self.send(builder).await?;
        if response.status() == StatusCode::ACCEPTED {
            let location = header_value(&response, LOCATION.as_str());
            let mut accepted: ToolCallAccepted = Self::decode(response).await?;
            if let Some(location) = location {
                accepted.location = location;
            }
            return Ok(ToolCallStart::Accepted(accepted));
        }
        Ok(ToolCallStart::Completed(Self::decode(response).await?))
    }

    /// Poll a long-running call's status path (as given in `Location`).
    pub async fn poll_tool_status(&self, status_path: &str) -> Result<ToolStatus, CliError> {
        let response = self.send(self.request(Method::GET, status_path)).await?;
        if response.status() == StatusCode::ACCEPTED {
            return Ok(ToolStatus::Running);
        }
        Ok(ToolStatus::Finished(Self::decode(response).await?))
    }

    pub async fn poll_requests(&self) -> Result<Option<PolledRequest>, CliError> {
        let response = self.send(self.request(Method::GET, "/requests")).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let request_id = header_value(&response, REQUEST_ID_HEADER).ok_or_else(|| {
            CliError::Decode(format!("request delivered without {REQUEST_ID_HEADER}"))
        })?;
        Ok(Some(PolledRequest {
            request_id,
            request: Self::decode(response).await?,
        }))
    }

    pub async fn respond(&self, request_id: &str, result: &Value) -> Result<(), CliError> {
        let builder = self
            .request(Method::POST, "/responses")
            .header(REQUEST_ID_HEADER, request_id);
        self.post_accepted(builder, result).await
    }

    /// `None` when nothing is outstanding (the server answers `[]`).
    pub async fn poll_notifications(&self) -> Result<Option<NotificationBatch>, CliError> {
        let response = self
            .send(self.request(Method::GET, "/notifications"))
            .await?;
        let group_id = header_value(&response, GROUP_ID_HEADER);
        let notifications: Vec<Value> = Self::decode(response).await?;
        match group_id {
            Some(group_id) => Ok(Some(NotificationBatch {
                group_id,
                notifications,
            })),
            None if notifications.is_empty() => Ok(None),
            None => Err(CliError::Decode(format!(
                "notification group delivered without {GROUP_ID_HEADER}"
            ))),
        }
    }

    /// Acknowledge a group and/or send client notifications in one exchange.
    pub async fn acknowledge_notifications(
        &self,
        group_id: Option<&str>,
        notifications: &[Value],
    ) -> Result<(), CliError> {
        let mut builder = self.request(Method::POST, "/notifications");
        if let Some(id) = group_id {
            builder = builder.header(GROUP_ID_HEADER, id);
        }
        self.post_accepted(builder, notifications).await
    }

    pub async fn list_resources(&self) -> Result<ListResourcesResult, CliError> {
        self.get_json("/resources").await
    }

    pub async fn list_resource_templates(&self) -> Result<ListResourceTemplatesResult, CliError> {
        self.get_json("/resources/templates").await
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, CliError> {
        self.post_json("/resources/read", &uri_body(uri)).await
    }

    pub async fn subscribe_resource(&self, uri: &str) -> Result<(), CliError> {
        let builder = self.request(Method::POST, "/resources/subscribe");
        self.post_accepted(builder, &uri_body(uri)).await
    }

    pub async fn unsubscribe_resource(&self, uri: &str) -> Result<(), CliError> {
        let builder = self.request(Method::POST, "/resources/unsubscribe");
        self.post_accepted(builder, &uri_body(uri)).await
    }

    pub async fn list_prompts(&self) -> Result<ListPromptsResult, CliError> {
        self.get_json("/prompts").await
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GetPromptResult, CliError> {
        self.post_json(&format!("/prompts/{name}"), arguments).await
    }

    pub async fn get_log_level(&self) -> Result<LogLevelResponse, CliError> {
        self.get_json("/logLevel").await
    }

    pub async fn set_log_level(&self, level: &str) -> Result<LogLevelResponse, CliError> {
        self.post_json(
            "/logLevel",
            &LogLevelRequest {
                level: Some(level.to_string()),
            },
        )
        .await
    }
}

fn uri_body(uri: &str) -> ResourceUriRequest {
    ResourceUriRequest {
        uri: uri.to_string(),
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
