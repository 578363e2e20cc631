use super::types::UpstreamErrorBody;
use crate::models::ProviderSettings;
use crate::{Error, Result};
use reqwest::multipart::Form;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Thin REST wrapper shared by the Stability generation and engine-list calls.
pub struct StabilityHttpClient {
    pub(crate) client: Client,
    pub(crate) settings: ProviderSettings,
}

impl StabilityHttpClient {
    pub fn new_with_client(settings: ProviderSettings, client: Client) -> Self {
        Self { client, settings }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.settings.api_key)
    }

    pub async fn get_json<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp> {
        let url = self.settings.endpoint(path);
        let response = self
            .client
            .get(&url)
            .timeout(self.settings.timeout)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Stability: {}", e);
                e
            })?;

        Self::parse_json(Self::check_status(response).await?).await
    }

    pub async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = self.settings.endpoint(path);
        let response = self
            .client
            .post(&url)
            .timeout(self.settings.timeout)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Stability: {}", e);
                e
            })?;

        Self::parse_json(Self::check_status(response).await?).await
    }

    /// Posts a multipart form and returns the raw image body (`Accept: image/*`).
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Vec<u8>> {
        let url = self.settings.endpoint(path);
        let response = self
            .client
            .post(&url)
            .timeout(self.settings.timeout)
            .header("Authorization", self.bearer())
            .header("Accept", "image/*")
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send multipart request to Stability: {}", e);
                e
            })?;

        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn check_status(response: Response) -> Result<Response> {
        // Only a plain 200 carries a result; other 2xx codes are errors too.
        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await?;
        tracing::error!("Stability API error (status {}): {}", status, body);
        Err(upstream_error(status.as_u16(), &body))
    }

    async fn parse_json<Resp: DeserializeOwned>(response: Response) -> Result<Resp> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Stability response: {}\nBody: {}", e, body);
            Error::UpstreamProtocol("Invalid response format from Stability AI API".to_string())
        })
    }
}

/// Prefers the upstream JSON `message` (or its `errors` list) over the raw body.
pub(crate) fn upstream_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<UpstreamErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.into_message())
        .unwrap_or_else(|| body.trim().to_string());
    Error::UpstreamHttp { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_uses_message_field() {
        let err = upstream_error(401, r#"{"id":"x","name":"unauthorized","message":"bad key"}"#);
        assert_eq!(err.to_string(), "HTTP 401 - bad key");
    }

    #[test]
    fn test_upstream_error_joins_errors_list() {
        let err = upstream_error(400, r#"{"name":"bad_request","errors":["a","b"]}"#);
        assert_eq!(err.to_string(), "HTTP 400 - a; b");
    }

    #[test]
    fn test_upstream_error_falls_back_to_raw_body() {
        let err = upstream_error(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502 - Bad Gateway");
    }
}
