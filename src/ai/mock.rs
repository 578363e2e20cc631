use super::{AssistantReport, AssistantService, ImageGenerationService, ServiceFactory};
use crate::models::{ImageGenerationRequest, ProviderSettings};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A 1x1 opaque PNG, returned when no image response was queued.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49,
    0x44, 0x41, 0x54, // IDAT chunk
    0x78, 0xDA, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, 0xF7, 0x03,
    0x41, 0x43, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
    0xAE, 0x42, 0x60, 0x82,
];

#[derive(Clone, Default)]
pub struct MockImageGenerationClient {
    image_responses: Arc<Mutex<Vec<Vec<u8>>>>,
    models: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<(u16, String)>>>,
    requests: Arc<Mutex<Vec<ImageGenerationRequest>>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_response(self, response: Vec<u8>) -> Self {
        self.image_responses.lock().unwrap().push(response);
        self
    }

    pub fn with_models(self, models: &[&str]) -> Self {
        *self.models.lock().unwrap() = models.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Every call fails as if the upstream answered with `status`.
    pub fn with_upstream_failure(self, status: u16, message: &str) -> Self {
        *self.failure.lock().unwrap() = Some((status, message.to_string()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ImageGenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().unwrap().clone() {
            Some((status, message)) => Err(Error::UpstreamHttp { status, message }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, request: &ImageGenerationRequest) -> Result<Vec<u8>> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        self.check_failure()?;

        let responses = self.image_responses.lock().unwrap();
        if responses.is_empty() {
            Ok(TINY_PNG.to_vec())
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }

    async fn test_connection(&self) -> Result<Vec<String>> {
        self.check_failure()?;
        Ok(self.models.lock().unwrap().clone())
    }
}

#[derive(Clone, Default)]
pub struct MockAssistantClient {
    replies: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    report: Arc<Mutex<Option<AssistantReport>>>,
}

impl MockAssistantClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push(reply.to_string());
        self
    }

    /// Every `ask` ends as a failed run with `detail`.
    pub fn with_failed_run(self, detail: &str) -> Self {
        *self.failure.lock().unwrap() = Some(detail.to_string());
        self
    }

    pub fn with_report(self, report: AssistantReport) -> Self {
        *self.report.lock().unwrap() = Some(report);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl AssistantService for MockAssistantClient {
    async fn ask(&self, prompt: &str) -> Result<String> {
        let count = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if let Some(detail) = self.failure.lock().unwrap().clone() {
            return Err(Error::RunTerminated {
                status: "failed".to_string(),
                detail,
            });
        }

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok(format!("<p>{}</p>", prompt))
        } else {
            Ok(replies[(count - 1) % replies.len()].clone())
        }
    }

    async fn test_connection(&self) -> Result<AssistantReport> {
        match self.report.lock().unwrap().clone() {
            Some(report) => Ok(report),
            None => Err(Error::UpstreamHttp {
                status: 404,
                message: "No assistant found".to_string(),
            }),
        }
    }
}

/// Hands out clones of the configured mocks and remembers the settings each
/// client was built with.
#[derive(Clone, Default)]
pub struct MockServiceFactory {
    pub image: MockImageGenerationClient,
    pub assistant: MockAssistantClient,
    settings: Arc<Mutex<Vec<ProviderSettings>>>,
    assistant_ids: Arc<Mutex<Vec<String>>>,
}

impl MockServiceFactory {
    pub fn new(image: MockImageGenerationClient, assistant: MockAssistantClient) -> Self {
        Self {
            image,
            assistant,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> Vec<ProviderSettings> {
        self.settings.lock().unwrap().clone()
    }

    pub fn assistant_ids(&self) -> Vec<String> {
        self.assistant_ids.lock().unwrap().clone()
    }
}

impl ServiceFactory for MockServiceFactory {
    fn image_client(&self, settings: ProviderSettings) -> Box<dyn ImageGenerationService> {
        self.settings.lock().unwrap().push(settings);
        Box::new(self.image.clone())
    }

    fn assistant_client(
        &self,
        settings: ProviderSettings,
        assistant_id: String,
    ) -> Box<dyn AssistantService> {
        self.settings.lock().unwrap().push(settings);
        self.assistant_ids.lock().unwrap().push(assistant_id);
        Box::new(self.assistant.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AspectRatio;

    fn request() -> ImageGenerationRequest {
        ImageGenerationRequest {
            prompt: "a fox".to_string(),
            model: "stable-image-core".to_string(),
            aspect_ratio: AspectRatio::Square,
        }
    }

    #[tokio::test]
    async fn test_mock_image_client_default_is_png() {
        let client = MockImageGenerationClient::new();
        let bytes = client.generate_image(&request()).await.unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
        assert_eq!(client.get_call_count(), 1);
        assert_eq!(client.last_request().unwrap().prompt, "a fox");
    }

    #[tokio::test]
    async fn test_mock_image_client_cycles_responses() {
        let client = MockImageGenerationClient::new()
            .with_image_response(vec![1])
            .with_image_response(vec![2]);

        assert_eq!(client.generate_image(&request()).await.unwrap(), vec![1]);
        assert_eq!(client.generate_image(&request()).await.unwrap(), vec![2]);
        assert_eq!(client.generate_image(&request()).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_mock_assistant_custom_replies_and_failure() {
        let client = MockAssistantClient::new().with_reply("<p>one</p>");
        assert_eq!(client.ask("x").await.unwrap(), "<p>one</p>");
        assert_eq!(client.prompts(), vec!["x".to_string()]);

        let failing = MockAssistantClient::new().with_failed_run("boom");
        let err = failing.ask("x").await.unwrap_err();
        assert!(matches!(err, Error::RunTerminated { .. }));
    }
}
