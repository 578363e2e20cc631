mod assistant;
mod client;
pub mod types;

pub use assistant::{OpenAiAssistantClient, DEFAULT_POLL_INTERVAL};
