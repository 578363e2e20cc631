//! Assistants API request/response payloads used by the assistant client.

use crate::models::RunStatus;
use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/threads`.
#[derive(Debug, Serialize)]
pub struct CreateThreadRequest {
    pub messages: Vec<ThreadMessageInput>,
}

#[derive(Debug, Serialize)]
pub struct ThreadMessageInput {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Request body for `POST /v1/threads/{id}/runs`.
#[derive(Debug, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    pub last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
pub struct RunError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl Run {
    /// Best available explanation for a run that ended without completing.
    pub fn failure_detail(&self) -> String {
        match &self.last_error {
            Some(RunError {
                message: Some(message),
                ..
            }) => message.clone(),
            Some(RunError {
                code: Some(code), ..
            }) => code.clone(),
            _ => "no error detail provided".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageList {
    pub data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

/// Only `text` parts are read; other part types are skipped.
#[derive(Debug, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
pub struct MessageText {
    pub value: String,
}

impl ThreadMessage {
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|part| part.content_type == "text")
            .filter_map(|part| part.text.as_ref())
            .map(|text| text.value.as_str())
            .collect()
    }
}

/// `GET /v1/assistants/{id}`.
#[derive(Debug, Deserialize)]
pub struct Assistant {
    pub id: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub created_at: Option<i64>,
}
