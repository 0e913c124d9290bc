//! In-memory dispatch engine for the HTTP-polling transport.
//!
//! Every surface the server pushes through (notification groups, server
//! requests) is a [`LeaseQueue`]: items are claimed by exactly one poller,
//! acknowledged once, and redelivered when a lease expires. Long-running tool
//! calls are tracked separately by [`InvocationTracker`].

pub mod config;
pub mod correlator;
pub mod error;
pub mod invocations;
pub mod lease;
pub mod notifications;
pub mod reactivation;
pub mod tools;

pub use config::DispatchConfig;
pub use correlator::{ClaimedRequest, PendingResponse, RequestCorrelator};
pub use error::{DispatchError, RuntimeError};
pub use invocations::{InvocationStatus, InvocationTracker, InvokeOutcome};
pub use lease::{ItemId, ItemState, Lease, LeaseId, LeaseQueue};
pub use notifications::{NotificationDispatcher, NotificationGroup};
pub use reactivation::{Reactivate, ReactivationTimer};
pub use tools::{ToolError, ToolRegistry};
