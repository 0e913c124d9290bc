//! Fire-and-poll execution of long-running tool calls.
//!
//! Standard tools run inline. Long-running tools run on their own task under a
//! client-chosen call id; the status URL reports "processing" until the task
//! finishes, then hands out the result once and forgets the call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use pollmcp_core::protocol::{is_valid_call_id, tool_status_path};
use pollmcp_core::tools::{CallToolResult, ToolKind};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::error::RuntimeError;
use crate::tools::{ToolError, ToolRegistry};

type ToolOutcome = Result<CallToolResult, ToolError>;

struct Invocation {
    tool: String,
    handle: JoinHandle<ToolOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
    /// Standard tool; result returned in the same exchange
    Completed(CallToolResult),
    /// Long-running tool started; poll `status_path` for the result
    Accepted { call_id: String, status_path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvocationStatus {
    Running,
    Completed(CallToolResult),
    /// The tool reported a failure; the body carries `isError = true`
    Failed(CallToolResult),
    /// The task running the tool panicked or was aborted
    Crashed(String),
}

pub struct InvocationTracker {
    registry: Arc<dyn ToolRegistry>,
    running: Mutex<HashMap<String, Invocation>>,
}

impl InvocationTracker {
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self {
            registry,
            running: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Invocation>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Classify `tool` and either run it inline or start tracking it.
    pub async fn invoke(
        &self,
        tool: &str,
        call_id: Option<&str>,
        arguments: Map<String, Value>,
    ) -> Result<InvokeOutcome, RuntimeError> {
        match self.registry.classify(tool) {
            None => Err(RuntimeError::UnknownTool(tool.to_string())),
            Some(ToolKind::Standard) => {
                let result = self.registry.invoke(tool, arguments).await;
                Ok(InvokeOutcome::Completed(into_call_result(tool, result)))
            }
            Some(ToolKind::LongRunning) => {
                let call_id = call_id
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| RuntimeError::MissingCallId {
                        tool: tool.to_string(),
                    })?;
                self.start(tool, call_id, arguments)?;
                Ok(InvokeOutcome::Accepted {
                    call_id: call_id.to_string(),
                    status_path: tool_status_path(tool, call_id),
                })
            }
        }
    }

    /// Spawn a long-running call under `call_id`, which must be usable as a
    /// URL path segment as is.
    pub fn start(
        &self,
        tool: &str,
        call_id: &str,
        arguments: Map<String, Value>,
    ) -> Result<(), RuntimeError> {
        if !is_valid_call_id(call_id) {
            return Err(RuntimeError::InvalidCallId {
                call_id: call_id.to_string(),
            });
        }
        let mut running = self.lock();
        if running.contains_key(call_id) {
            return Err(RuntimeError::DuplicateInvocation {
                call_id: call_id.to_string(),
            });
        }

        let registry = self.registry.clone();
        let name = tool.to_string();
        let handle = tokio::spawn(async move { registry.invoke(&name, arguments).await });
        running.insert(
            call_id.to_string(),
            Invocation {
                tool: tool.to_string(),
                handle,
            },
        );
        tracing::info!(tool, call_id, "long-running tool call started");
        Ok(())
    }

    /// `None` when the call id is unknown to `tool` (never started, or its
    /// result was already retrieved).
    pub async fn poll_status(&self, tool: &str, call_id: &str) -> Option<InvocationStatus> {
        let invocation = {
            let mut running = self.lock();
            let entry = running.get(call_id)?;
            if entry.tool != tool {
                return None;
            }
            if !entry.handle.is_finished() {
                return Some(InvocationStatus::Running);
            }
            running.remove(call_id)?
        };

        let status = match invocation.handle.await {
            Ok(Ok(result)) if !result.is_error => InvocationStatus::Completed(result),
            Ok(Ok(result)) => InvocationStatus::Failed(result),
            Ok(Err(err)) => InvocationStatus::Failed(into_call_result(tool, Err(err))),
            Err(err) => {
                tracing::error!(tool, call_id, error = %err, "long-running tool task aborted");
                InvocationStatus::Crashed(format!("tool '{tool}' did not complete: {err}"))
            }
        };
        tracing::info!(
            tool,
            call_id,
            failed = !matches!(status, InvocationStatus::Completed(_)),
            "long-running tool result retrieved"
        );
        Some(status)
    }

    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }

    pub fn abort_all(&self) {
        for (call_id, invocation) in self.lock().drain() {
            tracing::debug!(call_id = %call_id, tool = %invocation.tool, "aborting long-running tool call");
            invocation.handle.abort();
        }
    }
}

fn into_call_result(tool: &str, outcome: ToolOutcome) -> CallToolResult {
    match outcome {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(tool, error = %err, "tool call failed");
            CallToolResult::error(err.to_string())
        }
    }
}
