use super::client::StabilityHttpClient;
use super::endpoint::{select_endpoint, Endpoint, V2BETA_MAX_STEPS};
use super::types::{Engine, TextPrompt, TextToImageRequest, TextToImageResponse};
use crate::ai::ImageGenerationService;
use crate::models::{ImageGenerationRequest, ProviderSettings};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::multipart::Form;

const SAMPLES: u32 = 1;
const CFG_SCALE: u32 = 7;
const STEPS: u32 = 30;

pub struct StabilityImageClient {
    http: StabilityHttpClient,
}

impl StabilityImageClient {
    pub fn new(settings: ProviderSettings) -> Self {
        Self::new_with_client(settings, reqwest::Client::new())
    }

    pub fn new_with_client(settings: ProviderSettings, client: reqwest::Client) -> Self {
        Self {
            http: StabilityHttpClient::new_with_client(settings, client),
        }
    }

    async fn generate_v1(&self, request: &ImageGenerationRequest) -> Result<Vec<u8>> {
        let dims = request.aspect_ratio.dimensions();
        let body = TextToImageRequest {
            text_prompts: vec![TextPrompt {
                text: request.prompt.clone(),
                weight: 1.0,
            }],
            height: dims.height,
            width: dims.width,
            samples: SAMPLES,
            cfg_scale: CFG_SCALE,
            steps: STEPS,
        };

        let path = Endpoint::V1Legacy.path(&request.model);
        let response: TextToImageResponse = self.http.post_json(&path, &body).await?;

        let artifacts = response.artifacts.ok_or_else(|| {
            Error::UpstreamProtocol("Invalid response format from Stability AI API".to_string())
        })?;

        let encoded = artifacts
            .first()
            .and_then(|artifact| artifact.base64.as_deref())
            .filter(|b64| !b64.is_empty())
            .ok_or_else(|| {
                Error::UpstreamProtocol("No image data in the v1 API response".to_string())
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::UpstreamProtocol(format!("Failed to decode base64 image: {}", e)))
    }

    async fn generate_v2beta(
        &self,
        endpoint: Endpoint,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<u8>> {
        let dims = request.aspect_ratio.dimensions();
        let form = Form::new()
            .text("prompt", request.prompt.clone())
            .text("height", dims.height.to_string())
            .text("width", dims.width.to_string())
            .text("samples", SAMPLES.to_string())
            .text("cfg_scale", CFG_SCALE.to_string())
            .text("steps", STEPS.min(V2BETA_MAX_STEPS).to_string())
            .text("model", endpoint.api_model(&request.model))
            .text("aspect_ratio", dims.api_ratio.to_string());

        let bytes = self
            .http
            .post_multipart(&endpoint.path(&request.model), form)
            .await?;

        if bytes.is_empty() {
            return Err(Error::UpstreamProtocol(
                "Empty image body from v2beta API".to_string(),
            ));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ImageGenerationService for StabilityImageClient {
    async fn generate_image(&self, request: &ImageGenerationRequest) -> Result<Vec<u8>> {
        let endpoint = select_endpoint(&request.model);
        tracing::info!(
            "Generating image with model {} via {:?} ({:?})",
            request.model,
            endpoint,
            request.aspect_ratio
        );

        if endpoint.is_v2beta() {
            self.generate_v2beta(endpoint, request).await
        } else {
            self.generate_v1(request).await
        }
    }

    async fn test_connection(&self) -> Result<Vec<String>> {
        let engines: Vec<Engine> = self.http.get_json("/v1/engines/list").await?;
        Ok(engines.into_iter().filter_map(|engine| engine.id).collect())
    }
}
