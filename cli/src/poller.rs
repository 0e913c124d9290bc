//! Background loop that turns the pull-only transport back into push.
//!
//! Each tick claims at most one server request and hands it to the
//! [`ServerRequestHandler`], claims and acknowledges at most one notification
//! group, and polls the status URL of every outstanding long-running call.
//! Failures are logged; the loop keeps running until cancelled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pollmcp_core::notifications::ServerNotification;
use pollmcp_core::requests::{ServerRequest, error_result};
use pollmcp_core::tools::CallToolResult;
use serde_json::{Map, Value};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::{PollingClient, ToolCallStart, ToolStatus};
use crate::handler::ServerRequestHandler;
use crate::util::CliError;

/// JSON-RPC "invalid params".
const INVALID_PARAMS: i64 = -32602;
pub const NOTIFICATION_BUFFER: usize = 256;

type CallWaiters = Arc<Mutex<HashMap<String, oneshot::Sender<Result<CallToolResult, CliError>>>>>;

struct PollContext {
    client: Arc<PollingClient>,
    handler: Arc<dyn ServerRequestHandler>,
    notifications: mpsc::Sender<ServerNotification>,
    waiters: CallWaiters,
}

pub struct ClientPoller {
    client: Arc<PollingClient>,
    waiters: CallWaiters,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ClientPoller {
    /// Start the loop. Server notifications arrive on the returned receiver;
    /// once it holds [`NOTIFICATION_BUFFER`] undelivered items further
    /// notifications are dropped so the loop never stalls.
    pub fn spawn(
        client: Arc<PollingClient>,
        handler: Arc<dyn ServerRequestHandler>,
        interval: Duration,
    ) -> (Self, mpsc::Receiver<ServerNotification>) {
        let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
        let waiters: CallWaiters = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();

        let ctx = PollContext {
            client: client.clone(),
            handler,
            notifications: tx,
            waiters: waiters.clone(),
        };
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                ctx.tick().await;
            }
            tracing::debug!("client poller stopped");
        });

        (
            Self {
                client,
                waiters,
                cancel,
                task: Some(task),
            },
            rx,
        )
    }

    pub fn client(&self) -> &PollingClient {
        &self.client
    }

    /// Call a tool. Long-running calls get a fresh call id and resolve once
    /// the poller sees their final status.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        long_running: bool,
    ) -> Result<CallToolResult, CliError> {
        let call_id = long_running.then(|| uuid::Uuid::now_v7().to_string());
        match self
            .client
            .start_tool_call(name, arguments, call_id.as_deref())
            .await?
        {
            ToolCallStart::Completed(result) => Ok(result),
            ToolCallStart::Accepted(accepted) => {
                let (tx, rx) = oneshot::channel();
                self.waiters
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(accepted.location.clone(), tx);
                tracing::info!(
                    tool = %name,
                    call_id = %accepted.call_id,
                    location = %accepted.location,
                    "long-running call accepted"
                );
                rx.await.map_err(|_| CliError::PollerStopped)?
            }
        }
    }

    /// Long-running calls still waiting for a final status.
    pub fn outstanding_calls(&self) -> usize {
        self.waiters.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the loop and wait for the current tick to finish. Calls still
    /// outstanding are abandoned locally; the server keeps running them.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "client poller task ended abnormally");
            }
        }
        self.waiters.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Drop for ClientPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl PollContext {
    async fn tick(&self) {
        if let Err(e) = self.serve_one_request().await {
            tracing::warn!(error = %e, "polling server requests failed");
        }
        if let Err(e) = self.drain_one_group().await {
            tracing::warn!(error = %e, "polling notifications failed");
        }
        self.check_calls().await;
    }

    async fn serve_one_request(&self) -> Result<(), CliError> {
        let Some(polled) = self.client.poll_requests().await? else {
            return Ok(());
        };
        let answer = match ServerRequest::from_value(polled.request) {
            Ok(request) => {
                tracing::info!(
                    request_id = %polled.request_id,
                    method = %request.method(),
                    "handling server request"
                );
                self.handler.handle(request).await
            }
            Err(e) => {
                tracing::warn!(request_id = %polled.request_id, error = %e, "malformed server request");
                error_result(INVALID_PARAMS, &format!("malformed request: {e}"))
            }
        };
        self.client.respond(&polled.request_id, &answer).await
    }

    async fn drain_one_group(&self) -> Result<(), CliError> {
        let Some(batch) = self.client.poll_notifications().await? else {
            return Ok(());
        };
        tracing::debug!(
            group_id = %batch.group_id,
            count = batch.notifications.len(),
            "received notification group"
        );
        for raw in batch.notifications {
            match ServerNotification::from_value(raw) {
                Ok(notification) => match self.notifications.try_send(notification) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => tracing::warn!(
                        method = %dropped.method(),
                        "notification receiver is not keeping up, dropping notification"
                    ),
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!("notification receiver dropped")
                    }
                },
                Err(e) => tracing::warn!(error = %e, "dropping malformed notification"),
            }
        }
        self.client
            .acknowledge_notifications(Some(&batch.group_id), &[])
            .await
    }

    async fn check_calls(&self) {
        let locations: Vec<String> = self
            .waiters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();

        for location in locations {
            let outcome = match self.client.poll_tool_status(&location).await {
                Ok(ToolStatus::Running) => continue,
                Ok(ToolStatus::Finished(result)) => Ok(result),
                Err(e) => {
                    tracing::warn!(location = %location, error = %e, "long-running call failed");
                    Err(e)
                }
            };
            let waiter = self
                .waiters
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&location);
            if let Some(waiter) = waiter {
                let _ = waiter.send(outcome);
            }
        }
    }
}
