//! Server-to-client notification groups.
//!
//! Notifications are buffered individually. A poll turns everything buffered
//! since the previous poll into one group and leases it as a single item, so a
//! group is acknowledged or redelivered as a whole.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pollmcp_core::notifications::{ClientNotification, ServerNotification};
use serde_json::Value;

use crate::config::DispatchConfig;
use crate::lease::{LeaseId, LeaseQueue};
use crate::reactivation::ReactivationTimer;

/// One leased group, as handed to a poller.
#[derive(Debug, Clone)]
pub struct NotificationGroup {
    pub group_id: LeaseId,
    pub notifications: Vec<Value>,
    pub delivery: u32,
}

pub struct NotificationDispatcher {
    buffer: Mutex<Vec<Value>>,
    groups: Arc<LeaseQueue<Arc<Vec<Value>>>>,
    timer: Mutex<Option<ReactivationTimer>>,
}

impl NotificationDispatcher {
    pub fn new(lease_timeout: Duration) -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            groups: Arc::new(LeaseQueue::new("notifications", lease_timeout)),
            timer: Mutex::new(None),
        }
    }

    /// Build the dispatcher and start its reactivation sweep. Must be called
    /// inside a tokio runtime.
    pub fn start(config: &DispatchConfig) -> Self {
        let dispatcher = Self::new(config.lease_timeout);
        let timer = ReactivationTimer::spawn(dispatcher.groups.clone(), config.sweep_interval);
        *dispatcher.timer.lock().unwrap_or_else(|e| e.into_inner()) = Some(timer);
        dispatcher
    }

    pub fn enqueue(&self, notification: Value) {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }

    pub fn notify(&self, notification: ServerNotification) {
        tracing::debug!(method = notification.method(), "notification buffered");
        self.enqueue(notification.into());
    }

    pub fn enqueue_batch(&self, notifications: impl IntoIterator<Item = Value>) -> usize {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        let before = buffer.len();
        buffer.extend(notifications);
        buffer.len() - before
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Claim a group. A reactivated group goes out before anything still in
    /// the buffer; `None` means there is nothing to deliver.
    pub fn poll(&self) -> Option<NotificationGroup> {
        if let Some(lease) = self.groups.claim() {
            return Some(NotificationGroup {
                group_id: lease.lease_id,
                notifications: lease.payload.as_ref().clone(),
                delivery: lease.delivery,
            });
        }

        let drained = {
            let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
            if buffer.is_empty() {
                return None;
            }
            std::mem::take(&mut *buffer)
        };
        let lease = self.groups.enqueue_claimed(Arc::new(drained));
        tracing::debug!(
            group_id = %lease.lease_id,
            size = lease.payload.len(),
            "notification group formed"
        );
        Some(NotificationGroup {
            group_id: lease.lease_id,
            notifications: lease.payload.as_ref().clone(),
            delivery: lease.delivery,
        })
    }

    pub fn acknowledge(&self, group_id: LeaseId) -> bool {
        let acknowledged = self.groups.acknowledge(group_id);
        if !acknowledged {
            tracing::debug!(group_id = %group_id, "acknowledgment for unknown notification group");
        }
        acknowledged
    }

    /// Parse client-sent notifications, dropping unknown kinds and malformed
    /// entries with a warning.
    pub fn receive(&self, raw: Vec<Value>) -> Vec<ClientNotification> {
        raw.into_iter()
            .filter_map(|value| match ClientNotification::from_value(value) {
                Ok(ClientNotification::Unknown { method }) => {
                    tracing::warn!(method = %method, "dropping unknown client notification");
                    None
                }
                Ok(notification) => Some(notification),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed client notification");
                    None
                }
            })
            .collect()
    }

    pub fn reactivate_expired(&self) -> usize {
        self.groups.reactivate_expired()
    }

    pub fn outstanding_groups(&self) -> usize {
        self.groups.len()
    }

    pub async fn shutdown(&self) {
        let timer = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(timer) = timer {
            timer.shutdown().await;
        }
    }
}
