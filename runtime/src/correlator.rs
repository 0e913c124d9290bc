//! Server-initiated requests awaiting a client answer.
//!
//! `dispatch` leases the request through a [`LeaseQueue`] and hands the caller a
//! [`PendingResponse`]. The first `resolve` for any lease of that request
//! fulfills it; every later answer is rejected because the item is gone.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use pollmcp_core::requests::{ElicitParams, ElicitResult, ServerRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::lease::{ItemId, LeaseId, LeaseQueue};
use crate::reactivation::ReactivationTimer;

type Outcome = Result<Value, DispatchError>;

struct RequestEntry {
    request: Value,
    /// `None` for fire-and-forget requests, and once the answer was sent
    responder: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl RequestEntry {
    fn fulfill(&self, outcome: Outcome) {
        let responder = self
            .responder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(tx) = responder {
            // The caller may have stopped waiting; nothing to do then.
            let _ = tx.send(outcome);
        }
    }
}

type RequestQueue = LeaseQueue<Arc<RequestEntry>>;

/// A request handed to a polling client.
#[derive(Debug, Clone)]
pub struct ClaimedRequest {
    /// Lease id, sent as `Mcp-Request-Id`
    pub request_id: LeaseId,
    pub request: Value,
    pub delivery: u32,
}

/// Resolves with the client's result. Dropping it before completion withdraws
/// the request, so it is not redelivered and late answers are rejected.
pub struct PendingResponse {
    item_id: ItemId,
    rx: oneshot::Receiver<Outcome>,
    queue: Arc<RequestQueue>,
    settled: bool,
}

impl PendingResponse {
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }
}

impl Future for PendingResponse {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => {
                this.settled = true;
                Poll::Ready(outcome)
            }
            Poll::Ready(Err(_)) => {
                this.settled = true;
                Poll::Ready(Err(DispatchError::Withdrawn))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if !self.settled && self.queue.withdraw(self.item_id).is_some() {
            tracing::debug!(item_id = %self.item_id, "pending request withdrawn by caller");
        }
    }
}

pub struct RequestCorrelator {
    queue: Arc<RequestQueue>,
    response_timeout: Option<Duration>,
    timer: Mutex<Option<ReactivationTimer>>,
}

impl RequestCorrelator {
    pub fn new(lease_timeout: Duration, response_timeout: Option<Duration>) -> Self {
        Self {
            queue: Arc::new(LeaseQueue::new("requests", lease_timeout)),
            response_timeout,
            timer: Mutex::new(None),
        }
    }

    /// Build the correlator and start its reactivation sweep. Must be called
    /// inside a tokio runtime.
    pub fn start(config: &DispatchConfig) -> Self {
        let correlator = Self::new(config.lease_timeout, config.response_timeout);
        let timer = ReactivationTimer::spawn(correlator.queue.clone(), config.sweep_interval);
        *correlator.timer.lock().unwrap_or_else(|e| e.into_inner()) = Some(timer);
        correlator
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }

    /// Enqueue a request and return the future of its answer.
    pub fn dispatch(&self, request: Value) -> PendingResponse {
        let (tx, rx) = oneshot::channel();
        let item_id = self.queue.enqueue(Arc::new(RequestEntry {
            request,
            responder: Mutex::new(Some(tx)),
        }));
        tracing::debug!(item_id = %item_id, "server request dispatched");
        PendingResponse {
            item_id,
            rx,
            queue: self.queue.clone(),
            settled: false,
        }
    }

    /// Enqueue a request nobody waits on. The client still has to answer it.
    pub fn enqueue_detached(&self, request: Value) -> ItemId {
        let item_id = self.queue.enqueue(Arc::new(RequestEntry {
            request,
            responder: Mutex::new(None),
        }));
        tracing::debug!(item_id = %item_id, "detached server request enqueued");
        item_id
    }

    /// Dispatch and wait, bounded by the configured response timeout.
    pub async fn request(&self, request: Value) -> Result<Value, DispatchError> {
        let pending = self.dispatch(request);
        match self.response_timeout {
            Some(after) => match tokio::time::timeout(after, pending).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(timeout_secs = after.as_secs(), "server request timed out");
                    Err(DispatchError::TimedOut { after })
                }
            },
            None => pending.await,
        }
    }

    /// Typed variant of [`request`](Self::request). A result that does not
    /// match `R` is reported as [`DispatchError::UnexpectedResult`].
    pub async fn request_typed<R: DeserializeOwned>(
        &self,
        request: ServerRequest,
    ) -> Result<R, DispatchError> {
        let method = request.method().to_string();
        let result = self.request(request.into()).await?;
        serde_json::from_value(result)
            .map_err(|source| DispatchError::UnexpectedResult { method, source })
    }

    pub async fn elicit(&self, params: ElicitParams) -> Result<ElicitResult, DispatchError> {
        self.request_typed(ServerRequest::Elicit(params)).await
    }

    /// Lease the oldest active request, or `None` when there is nothing to do.
    pub fn poll(&self) -> Option<ClaimedRequest> {
        let lease = self.queue.claim()?;
        tracing::debug!(
            request_id = %lease.lease_id,
            item_id = %lease.item_id,
            delivery = lease.delivery,
            "server request claimed"
        );
        Some(ClaimedRequest {
            request_id: lease.lease_id,
            request: lease.payload.request.clone(),
            delivery: lease.delivery,
        })
    }

    /// Deliver a client answer. False when the id is unknown or the request
    /// was already resolved, cancelled or withdrawn.
    pub fn resolve(&self, request_id: LeaseId, result: Value) -> bool {
        match self.queue.complete(request_id) {
            Some((item_id, entry)) => {
                tracing::debug!(request_id = %request_id, item_id = %item_id, "server request resolved");
                entry.fulfill(Ok(result));
                true
            }
            None => false,
        }
    }

    /// Handle a client `notifications/cancelled` for one of our requests.
    pub fn cancel(&self, request_id: &Value, reason: Option<String>) -> bool {
        let Some(lease_id) = request_id.as_str().and_then(|raw| Uuid::parse_str(raw).ok()) else {
            tracing::warn!(request_id = %request_id, "cancellation for a non-lease request id");
            return false;
        };
        match self.queue.complete(lease_id) {
            Some((item_id, entry)) => {
                tracing::info!(
                    request_id = %lease_id,
                    item_id = %item_id,
                    reason = reason.as_deref().unwrap_or(""),
                    "server request cancelled by client"
                );
                entry.fulfill(Err(DispatchError::Cancelled { reason }));
                true
            }
            None => false,
        }
    }

    pub fn reactivate_expired(&self) -> usize {
        self.queue.reactivate_expired()
    }

    pub fn outstanding(&self) -> usize {
        self.queue.len()
    }

    pub async fn shutdown(&self) {
        let timer = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(timer) = timer {
            timer.shutdown().await;
        }
    }
}
