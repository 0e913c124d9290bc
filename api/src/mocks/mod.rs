//! Demo collaborators behind the transport: tools, resources, prompts and a
//! notifier that produces resource-update traffic.

pub mod notifier;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use prompts::MockPrompts;
pub use resources::MockResources;
pub use tools::MockToolRegistry;
