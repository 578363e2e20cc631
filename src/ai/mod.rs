//! AI provider integration for image and assistant-text generation
//!
//! Provides interfaces to Stability.ai's text-to-image endpoints and to an
//! OpenAI-compatible Assistants API. Clients are built per call because the
//! editor may override the key, base URL and timeout on every request.

pub mod factory;
pub mod fence;
pub mod mime;
pub mod mock;
pub mod openai;
pub mod stability;

pub use factory::{HttpServiceFactory, ServiceFactory};
pub use fence::strip_code_fence;
pub use mock::{MockAssistantClient, MockImageGenerationClient, MockServiceFactory};
pub use openai::OpenAiAssistantClient;
pub use stability::StabilityImageClient;

use crate::models::ImageGenerationRequest;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate_image(&self, request: &ImageGenerationRequest) -> Result<Vec<u8>>;

    /// Lists the engine ids visible to the configured key.
    async fn test_connection(&self) -> Result<Vec<String>>;
}

/// Outcome of checking an assistant id against the upstream API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReport {
    pub id: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub created: Option<String>,
}

impl AssistantReport {
    pub fn describe(&self) -> String {
        let mut details = String::from("Assistant ID is valid.\n");
        if let Some(id) = &self.id {
            details.push_str(&format!("Assistant ID: {}\n", id));
        }
        if let Some(name) = &self.name {
            details.push_str(&format!("Name: {}\n", name));
        }
        if let Some(model) = &self.model {
            details.push_str(&format!("Model: {}\n", model));
        }
        if let Some(created) = &self.created {
            details.push_str(&format!("Created: {}\n", created));
        }
        details
    }
}

#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Runs the assistant against a fresh thread holding `prompt` and returns
    /// the assistant's reply text.
    async fn ask(&self, prompt: &str) -> Result<String>;

    async fn test_connection(&self) -> Result<AssistantReport>;
}
