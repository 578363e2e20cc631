use super::{AssistantService, ImageGenerationService, OpenAiAssistantClient, StabilityImageClient};
use crate::models::ProviderSettings;

/// Builds provider clients for one request's settings.
pub trait ServiceFactory: Send + Sync {
    fn image_client(&self, settings: ProviderSettings) -> Box<dyn ImageGenerationService>;

    fn assistant_client(
        &self,
        settings: ProviderSettings,
        assistant_id: String,
    ) -> Box<dyn AssistantService>;
}

/// Real clients sharing one connection pool.
#[derive(Clone, Default)]
pub struct HttpServiceFactory {
    client: reqwest::Client,
}

impl HttpServiceFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ServiceFactory for HttpServiceFactory {
    fn image_client(&self, settings: ProviderSettings) -> Box<dyn ImageGenerationService> {
        Box::new(StabilityImageClient::new_with_client(
            settings,
            self.client.clone(),
        ))
    }

    fn assistant_client(
        &self,
        settings: ProviderSettings,
        assistant_id: String,
    ) -> Box<dyn AssistantService> {
        Box::new(OpenAiAssistantClient::new_with_client(
            settings,
            assistant_id,
            self.client.clone(),
        ))
    }
}
