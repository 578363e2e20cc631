//! Request forwarding for the editor dialogs
//!
//! `forward_image` and `forward_text` take the decoded form and the caller's
//! [`AuthContext`], call the provider, and always produce a
//! [`ForwardResponse`] envelope. Failures become `{success: false, error}`.

use crate::ai::mime::{detect_image_mime, extension_for_mime};
use crate::ai::{strip_code_fence, AssistantService, ImageGenerationService};
use crate::app::App;
use crate::auth::{AuthContext, Capability};
use crate::models::{
    parse_timeout_secs, AspectRatio, FileRecord, ForwardResponse, ImageGenerationRequest,
    ProviderSettings, UsageRecord,
};
use crate::prompts::compose_text_prompt;
use crate::storage::put_with_retry;
use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

pub const UNSUPPORTED_ACTION: &str = "Unsupported action";
pub const FILE_COMPONENT: &str = "editor_ai_image";
pub const FILE_AREA: &str = "generated";
/// Context used when the caller does not name one.
pub const SYSTEM_CONTEXT_ID: u64 = 1;

/// Form posted by the image dialog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub prompt: String,
    pub apikey: Option<String>,
    pub baseurl: Option<String>,
    pub timeout: Option<String>,
    pub model: Option<String>,
    pub aspectratio: Option<String>,
    pub contextid: Option<String>,
}

/// Form posted by the text dialog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub prompt: String,
    pub context: Option<String>,
    pub apikey: Option<String>,
    pub baseurl: Option<String>,
    pub timeout: Option<String>,
    pub assistantid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Test,
    Generate,
}

impl Action {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "test" => Some(Action::Test),
            "generate" => Some(Action::Generate),
            _ => None,
        }
    }
}

/// Trimmed, non-empty value of an optional form field.
fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn resolve_settings(
    api_key: &Option<String>,
    base_url: &Option<String>,
    timeout: &Option<String>,
    default_key: Option<&str>,
    default_base_url: &str,
    default_timeout_secs: u64,
) -> Result<ProviderSettings> {
    let api_key = field(api_key)
        .or(default_key.map(str::trim).filter(|k| !k.is_empty()))
        .ok_or_else(|| Error::validation("API key is required"))?;
    let timeout_secs = match field(timeout) {
        Some(raw) => parse_timeout_secs(raw)?,
        None => default_timeout_secs,
    };

    Ok(ProviderSettings {
        api_key: api_key.to_string(),
        base_url: field(base_url).unwrap_or(default_base_url).to_string(),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_context_id(raw: &Option<String>) -> Result<u64> {
    match field(raw) {
        None => Ok(SYSTEM_CONTEXT_ID),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) => Ok(SYSTEM_CONTEXT_ID),
            Ok(id) => Ok(id),
            Err(_) => Err(Error::validation(format!("Invalid context id '{}'", raw))),
        },
    }
}

fn escape_attribute(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn image_tag(url: &str, prompt: &str) -> String {
    format!(
        "<img src=\"{}\" alt=\"AI generated image of {} created with Stability.ai\" \
         class=\"img-fluid ai-image-generated\">",
        escape_attribute(url),
        escape_attribute(prompt)
    )
}

fn image_test_error(err: Error) -> String {
    match err {
        Error::Validation(_) | Error::Unauthorized(_) => err.to_string(),
        Error::UpstreamProtocol(_) => "Invalid response from Stability AI API".to_string(),
        other => format!("Error connecting to Stability AI API: {}", other),
    }
}

fn image_generate_error(err: Error) -> String {
    match err {
        Error::Validation(_) | Error::Unauthorized(_) => err.to_string(),
        Error::UpstreamProtocol(message) => message,
        other => format!("Error generating image: {}", other),
    }
}

fn assistant_test_failure(err: Error) -> ForwardResponse {
    match err {
        Error::UpstreamHttp { status, message } => {
            let error = match status {
                401 => "Authentication error: API key is invalid.".to_string(),
                404 => "Assistant ID not found.".to_string(),
                other => format!("Unexpected error occurred (HTTP {})", other),
            };
            let response = ForwardResponse::failure(error);
            if message.is_empty() {
                response
            } else {
                response.with_details(serde_json::Value::String(format!(
                    "Error details: {}\n",
                    message
                )))
            }
        }
        other => ForwardResponse::failure(other.to_string()),
    }
}

impl App {
    /// Handles `/image`: `test` lists engines, `generate` returns an `<img>`.
    pub async fn forward_image(&self, auth: &AuthContext, form: ImageForm) -> ForwardResponse {
        if let Err(e) = auth.require(Capability::GenerateImage) {
            return ForwardResponse::failure(e.to_string());
        }

        let Some(action) = Action::parse(&form.action) else {
            tracing::warn!("Unsupported image action '{}'", form.action);
            return ForwardResponse::failure(UNSUPPORTED_ACTION);
        };

        let defaults = &self.config.stability;
        let settings = match resolve_settings(
            &form.apikey,
            &form.baseurl,
            &form.timeout,
            defaults.api_key.as_deref(),
            &defaults.base_url,
            defaults.timeout_secs,
        ) {
            Ok(settings) => settings,
            Err(e) => return ForwardResponse::failure(e.to_string()),
        };
        let client = self.factory.image_client(settings);

        match action {
            Action::Test => match client.test_connection().await {
                Ok(models) => {
                    tracing::info!("Stability connection test listed {} engines", models.len());
                    ForwardResponse::ok(String::new())
                        .with_details(serde_json::json!({ "models": models }))
                }
                Err(e) => {
                    tracing::warn!("Stability connection test failed: {}", e);
                    ForwardResponse::failure(image_test_error(e))
                }
            },
            Action::Generate => match self.generate_image(auth, client.as_ref(), &form).await {
                Ok(html) => ForwardResponse::ok(html),
                Err(e) => {
                    tracing::error!("Image generation failed: {}", e);
                    ForwardResponse::failure(image_generate_error(e))
                }
            },
        }
    }

    async fn generate_image(
        &self,
        auth: &AuthContext,
        client: &dyn ImageGenerationService,
        form: &ImageForm,
    ) -> Result<String> {
        let prompt = form.prompt.trim();
        if prompt.is_empty() {
            return Err(Error::validation("Prompt is required"));
        }
        let context_id = parse_context_id(&form.contextid)?;
        let model = field(&form.model)
            .unwrap_or(&self.config.stability.model)
            .to_string();

        let request = ImageGenerationRequest {
            prompt: prompt.to_string(),
            model,
            aspect_ratio: AspectRatio::parse(form.aspectratio.as_deref().unwrap_or_default()),
        };
        let generated = client.generate_image(&request).await?;
        tracing::info!("Generated image ({} bytes)", generated.len());
        self.usage.record(UsageRecord::new(auth.user_id, prompt));

        let marked = self.image.watermark(&generated).await;
        let content_type = detect_image_mime(&marked);

        let now = chrono::Utc::now();
        let record = FileRecord {
            context_id,
            component: FILE_COMPONENT.to_string(),
            area: FILE_AREA.to_string(),
            item_id: now.timestamp(),
            path: "/".to_string(),
            filename: format!(
                "aiimage_{}_{}.{}",
                now.timestamp(),
                &uuid::Uuid::new_v4().simple().to_string()[..8],
                extension_for_mime(content_type)
            ),
        };
        let url = put_with_retry(self.store.as_ref(), &record, &marked, content_type).await?;
        tracing::info!("Image stored at {}", url);

        Ok(image_tag(&url, prompt))
    }

    /// Handles `/text`: `test` checks the assistant id, `generate` asks it.
    pub async fn forward_text(&self, auth: &AuthContext, form: TextForm) -> ForwardResponse {
        let Some(action) = Action::parse(&form.action) else {
            tracing::warn!("Unsupported text action '{}'", form.action);
            return ForwardResponse::failure(UNSUPPORTED_ACTION);
        };

        let capability = match action {
            Action::Test => Capability::ManageConfig,
            Action::Generate => Capability::GenerateText,
        };
        if let Err(e) = auth.require(capability) {
            return ForwardResponse::failure(e.to_string());
        }

        let defaults = &self.config.openai;
        let settings = match resolve_settings(
            &form.apikey,
            &form.baseurl,
            &form.timeout,
            defaults.api_key.as_deref(),
            &defaults.base_url,
            defaults.timeout_secs,
        ) {
            Ok(settings) => settings,
            Err(e) => return ForwardResponse::failure(e.to_string()),
        };
        let Some(assistant_id) = field(&form.assistantid).or(defaults.assistant_id.as_deref())
        else {
            return ForwardResponse::failure("Assistant ID is required");
        };
        let client = self
            .factory
            .assistant_client(settings, assistant_id.to_string());

        match action {
            Action::Test => match client.test_connection().await {
                Ok(report) => ForwardResponse::ok(String::new())
                    .with_details(serde_json::Value::String(report.describe())),
                Err(e) => {
                    tracing::warn!("Assistant connection test failed: {}", e);
                    assistant_test_failure(e)
                }
            },
            Action::Generate => match self.ask_assistant(client.as_ref(), &form).await {
                Ok(content) => ForwardResponse::ok(content),
                Err(e) => {
                    tracing::error!("Assistant request failed: {}", e);
                    ForwardResponse::failure(e.to_string())
                }
            },
        }
    }

    async fn ask_assistant(&self, client: &dyn AssistantService, form: &TextForm) -> Result<String> {
        let prompt = form.prompt.trim();
        if prompt.is_empty() {
            return Err(Error::validation("Prompt is required"));
        }

        let message = compose_text_prompt(prompt, form.context.as_deref());
        let reply = client.ask(&message).await?;
        Ok(strip_code_fence(&reply))
    }
}
