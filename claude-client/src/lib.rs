mod client;
mod models;

pub use client::{ClaudeClient, ClaudeError, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use models::*;
