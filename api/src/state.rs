use std::sync::{Arc, RwLock};

use pollmcp_runtime::{InvocationTracker, NotificationDispatcher, RequestCorrelator};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::mocks::notifier::spawn_mock_notifier;
use crate::mocks::{MockPrompts, MockResources, MockToolRegistry};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Everything a handler can reach. Each instance owns its own queues, so
/// independent servers (and tests) never share dispatch state.
#[derive(Clone)]
pub struct AppState {
    pub notifications: Arc<NotificationDispatcher>,
    pub requests: Arc<RequestCorrelator>,
    pub invocations: Arc<InvocationTracker>,
    pub resources: Arc<MockResources>,
    pub prompts: Arc<MockPrompts>,
    pub log_level: Arc<RwLock<String>>,
    background: CancellationToken,
}

impl AppState {
    /// Build the dispatchers and start their background sweeps. Must be
    /// called inside a tokio runtime.
    pub fn new(config: &ServerConfig) -> Self {
        let notifications = Arc::new(NotificationDispatcher::start(&config.dispatch));
        let requests = Arc::new(RequestCorrelator::start(&config.dispatch));
        let registry = Arc::new(MockToolRegistry::new(
            requests.clone(),
            config.forecast_delay,
        ));
        let resources = Arc::new(MockResources::new());
        let background = CancellationToken::new();

        if let Some(period) = config.mock_notifier_interval {
            spawn_mock_notifier(
                resources.clone(),
                notifications.clone(),
                period,
                background.child_token(),
            );
        }

        Self {
            notifications,
            requests,
            invocations: Arc::new(InvocationTracker::new(registry)),
            resources,
            prompts: Arc::new(MockPrompts::new()),
            log_level: Arc::new(RwLock::new(DEFAULT_LOG_LEVEL.to_string())),
            background,
        }
    }

    pub fn log_level(&self) -> String {
        self.log_level
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_log_level(&self, level: String) {
        *self.log_level.write().unwrap_or_else(|e| e.into_inner()) = level;
    }

    /// Stop background tasks. In-flight long-running calls are aborted.
    pub async fn shutdown(&self) {
        self.background.cancel();
        self.notifications.shutdown().await;
        self.requests.shutdown().await;
        self.invocations.abort_all();
    }
}
