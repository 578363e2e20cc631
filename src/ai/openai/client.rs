use crate::models::ProviderSettings;
use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

pub struct OpenAiHttpClient {
    pub(crate) client: Client,
    pub(crate) settings: ProviderSettings,
}

impl OpenAiHttpClient {
    pub fn new_with_client(settings: ProviderSettings, client: Client) -> Self {
        Self { client, settings }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .timeout(self.settings.timeout)
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    pub async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = self.settings.endpoint(path);
        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to OpenAI: {}", e);
                e
            })?;

        Self::decode(response).await
    }

    pub async fn get<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp> {
        let url = self.settings.endpoint(path);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to OpenAI: {}", e);
                e
            })?;

        Self::decode(response).await
    }

    async fn decode<Resp: DeserializeOwned>(response: Response) -> Result<Resp> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("OpenAI API error (status {}): {}", status, error_text);
            return Err(Error::UpstreamHttp {
                status: status.as_u16(),
                message: error_message(&error_text),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}\nBody: {}", e, body);
            Error::UpstreamProtocol(format!("Failed to parse OpenAI response: {}", e))
        })
    }
}

/// Pulls `error.message` out of an OpenAI error body, else returns it trimmed.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
