//! Stability-specific request/response payloads.

use serde::{Deserialize, Serialize};

/// Request body for the v1 JSON text-to-image endpoint.
#[derive(Debug, Serialize)]
pub struct TextToImageRequest {
    pub text_prompts: Vec<TextPrompt>,
    pub height: u32,
    pub width: u32,
    pub samples: u32,
    pub cfg_scale: u32,
    pub steps: u32,
}

#[derive(Debug, Serialize)]
pub struct TextPrompt {
    pub text: String,
    pub weight: f32,
}

/// v1 response; `artifacts` stays optional so a missing field is reported
/// as a protocol error rather than a parse failure.
#[derive(Debug, Deserialize)]
pub struct TextToImageResponse {
    pub artifacts: Option<Vec<Artifact>>,
}

#[derive(Debug, Deserialize)]
pub struct Artifact {
    pub base64: Option<String>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// One entry of `GET /v1/engines/list`.
#[derive(Debug, Deserialize)]
pub struct Engine {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl UpstreamErrorBody {
    pub fn into_message(self) -> Option<String> {
        match (self.message, self.errors) {
            (Some(message), _) if !message.is_empty() => Some(message),
            (_, Some(errors)) if !errors.is_empty() => Some(errors.join("; ")),
            _ => None,
        }
    }
}
