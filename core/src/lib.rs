pub mod completions;
pub mod error;
pub mod notifications;
pub mod prompts;
pub mod protocol;
pub mod requests;
pub mod resources;
pub mod session;
pub mod tools;
