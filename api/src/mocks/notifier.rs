use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use pollmcp_core::notifications::{ResourceUpdatedParams, ServerNotification};
use pollmcp_runtime::NotificationDispatcher;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::MockResources;

/// Periodically marks every resource as changed and queues a
/// `notifications/resources/updated` for each subscribed one.
pub fn spawn_mock_notifier(
    resources: Arc<MockResources>,
    notifications: Arc<NotificationDispatcher>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(period_secs = period.as_secs(), "mock resource notifier started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("mock resource notifier stopped");
                    break;
                }
                _ = ticker.tick() => publish_updates(&resources, &notifications),
            }
        }
    })
}

fn publish_updates(resources: &MockResources, notifications: &NotificationDispatcher) {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let updated = resources.touch_all(&now);
    tracing::debug!(subscribed = updated.len(), "mock resource notifier tick");
    for uri in updated {
        notifications.notify(ServerNotification::ResourceUpdated(ResourceUpdatedParams { uri }));
    }
}
