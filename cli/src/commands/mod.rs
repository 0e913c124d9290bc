pub mod health;
pub mod listen;
pub mod prompts;
pub mod resources;
pub mod session;
pub mod tools;
