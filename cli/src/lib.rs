pub mod client;
pub mod handler;
pub mod poller;
pub mod util;

pub use client::{NotificationBatch, PolledRequest, PollingClient, ToolCallStart, ToolStatus};
pub use handler::{DefaultRequestHandler, ServerRequestHandler};
pub use poller::ClientPoller;
pub use util::CliError;
