//! Data models and structures
//!
//! Defines the per-request data structures exchanged with the editor and the
//! upstream providers, plus the environment-backed service configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound accepted for caller-supplied timeouts.
pub const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
}

/// Pixel size plus the ratio string the v2beta API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub api_ratio: &'static str,
}

impl AspectRatio {
    /// Unknown values fall back to square.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "landscape" => AspectRatio::Landscape,
            "portrait" => AspectRatio::Portrait,
            _ => AspectRatio::Square,
        }
    }

    pub fn dimensions(self) -> Dimensions {
        match self {
            AspectRatio::Square => Dimensions {
                width: 1024,
                height: 1024,
                api_ratio: "1:1",
            },
            AspectRatio::Landscape => Dimensions {
                width: 1344,
                height: 768,
                api_ratio: "16:9",
            },
            AspectRatio::Portrait => Dimensions {
                width: 768,
                height: 1344,
                api_ratio: "9:16",
            },
        }
    }
}

/// What to generate. Credentials and endpoint live in [`ProviderSettings`].
#[derive(Debug, Clone)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: AspectRatio,
}

/// Per-call upstream connection settings, after falling back to config.
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key_len", &self.api_key.len())
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderSettings {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// JSON envelope returned for every inbound call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardResponse {
    pub success: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ForwardResponse {
    pub fn ok(content: String) -> Self {
        Self {
            success: true,
            content,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Remote run lifecycle as reported by the Assistants API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Terminal states other than `Completed`. `RequiresAction` is included
    /// because this service never submits tool outputs.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
                | RunStatus::RequiresAction
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssistantRun {
    pub thread_id: String,
    pub run_id: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub user_id: u64,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(user_id: u64, prompt: &str) -> Self {
        Self {
            user_id,
            prompt: prompt.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Addresses one stored file, mirroring the host's
/// (context, component, area, item, path, filename) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub context_id: u64,
    pub component: String,
    pub area: String,
    pub item_id: i64,
    pub path: String,
    pub filename: String,
}

impl FileRecord {
    pub fn key(&self) -> String {
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            format!(
                "{}/{}/{}/{}/{}",
                self.context_id, self.component, self.area, self.item_id, self.filename
            )
        } else {
            format!(
                "{}/{}/{}/{}/{}/{}",
                self.context_id, self.component, self.area, self.item_id, path, self.filename
            )
        }
    }
}

// Configuration
#[derive(Clone)]
pub struct StabilityDefaults {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone)]
pub struct OpenAiDefaults {
    pub api_key: Option<String>,
    pub base_url: String,
    pub assistant_id: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone)]
pub enum StorageConfig {
    Local {
        dir: PathBuf,
        public_base_url: String,
    },
    S3 {
        access_key_id: String,
        secret_access_key: String,
        endpoint: String,
        bucket: String,
        public_base_url: String,
    },
}

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub session_key: Option<String>,
    pub stability: StabilityDefaults,
    pub openai: OpenAiDefaults,
    pub watermark_path: Option<PathBuf>,
    pub storage: StorageConfig,
    pub usage_log_path: Option<PathBuf>,
}

// Secrets only report whether they are set.
impl std::fmt::Debug for StabilityDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityDefaults")
            .field("api_key_set", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for OpenAiDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiDefaults")
            .field("api_key_set", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .field("assistant_id", &self.assistant_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageConfig::Local {
                dir,
                public_base_url,
            } => f
                .debug_struct("Local")
                .field("dir", dir)
                .field("public_base_url", public_base_url)
                .finish(),
            StorageConfig::S3 {
                access_key_id,
                endpoint,
                bucket,
                public_base_url,
                ..
            } => f
                .debug_struct("S3")
                .field("access_key_id", access_key_id)
                .field("endpoint", endpoint)
                .field("bucket", bucket)
                .field("public_base_url", public_base_url)
                .finish_non_exhaustive(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("session_key_set", &self.session_key.is_some())
            .field("stability", &self.stability)
            .field("openai", &self.openai)
            .field("watermark_path", &self.watermark_path)
            .field("storage", &self.storage)
            .field("usage_log_path", &self.usage_log_path)
            .finish()
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str, default: u64) -> crate::Result<u64> {
    match env_opt(name) {
        Some(raw) => parse_timeout_secs(&raw)
            .map_err(|e| crate::Error::Config(format!("{}: {}", name, e))),
        None => Ok(default),
    }
}

/// Parse a timeout in whole seconds, rejecting zero and absurd values.
pub fn parse_timeout_secs(raw: &str) -> crate::Result<u64> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| crate::Error::validation(format!("Invalid timeout '{}'", raw)))?;
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(crate::Error::validation(format!(
            "Timeout must be between 1 and {} seconds",
            MAX_TIMEOUT_SECS
        )));
    }
    Ok(secs)
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = match env_opt("STORAGE_BUCKET") {
            Some(bucket) => StorageConfig::S3 {
                access_key_id: env_opt("STORAGE_ACCESS_KEY_ID").ok_or_else(|| {
                    crate::Error::Config("STORAGE_ACCESS_KEY_ID not set".to_string())
                })?,
                secret_access_key: env_opt("STORAGE_SECRET_ACCESS_KEY").ok_or_else(|| {
                    crate::Error::Config("STORAGE_SECRET_ACCESS_KEY not set".to_string())
                })?,
                endpoint: env_opt("STORAGE_ENDPOINT").ok_or_else(|| {
                    crate::Error::Config("STORAGE_ENDPOINT not set".to_string())
                })?,
                bucket,
                public_base_url: env_opt("PUBLIC_BASE_URL").ok_or_else(|| {
                    crate::Error::Config("PUBLIC_BASE_URL not set".to_string())
                })?,
            },
            None => StorageConfig::Local {
                dir: env_opt("LOCAL_STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("files")),
                public_base_url: env_opt("PUBLIC_BASE_URL")
                    .unwrap_or_else(|| "/files".to_string()),
            },
        };

        Ok(Self {
            bind_addr: env_opt("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            session_key: env_opt("SESSION_KEY"),
            stability: StabilityDefaults {
                api_key: env_opt("STABILITY_API_KEY"),
                base_url: env_opt("STABILITY_BASE_URL")
                    .unwrap_or_else(|| "https://api.stability.ai".to_string()),
                model: env_opt("STABILITY_MODEL")
                    .unwrap_or_else(|| "stable-diffusion-xl-1024-v1-0".to_string()),
                timeout_secs: env_secs("STABILITY_TIMEOUT", 30)?,
            },
            openai: OpenAiDefaults {
                api_key: env_opt("OPENAI_API_KEY"),
                base_url: env_opt("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com".to_string()),
                assistant_id: env_opt("OPENAI_ASSISTANT_ID"),
                timeout_secs: env_secs("OPENAI_TIMEOUT", 30)?,
            },
            watermark_path: env_opt("WATERMARK_PATH").map(PathBuf::from),
            storage,
            usage_log_path: env_opt("USAGE_LOG_PATH").map(PathBuf::from),
        })
    }

    /// Defaults used by tests and local harnesses.
    pub fn for_local(dir: PathBuf) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            session_key: None,
            stability: StabilityDefaults {
                api_key: None,
                base_url: "https://api.stability.ai".to_string(),
                model: "stable-diffusion-xl-1024-v1-0".to_string(),
                timeout_secs: 30,
            },
            openai: OpenAiDefaults {
                api_key: None,
                base_url: "https://api.openai.com".to_string(),
                assistant_id: None,
                timeout_secs: 30,
            },
            watermark_path: None,
            storage: StorageConfig::Local {
                dir,
                public_base_url: "/files".to_string(),
            },
            usage_log_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aspect_ratio_table() {
        let cases = [
            ("square", 1024, 1024, "1:1"),
            ("landscape", 1344, 768, "16:9"),
            ("portrait", 768, 1344, "9:16"),
            ("panorama", 1024, 1024, "1:1"),
            ("", 1024, 1024, "1:1"),
        ];
        for (input, width, height, ratio) in cases {
            let dims = AspectRatio::parse(input).dimensions();
            assert_eq!((dims.width, dims.height, dims.api_ratio), (width, height, ratio));
        }
    }

    #[test]
    fn test_config_debug_hides_secrets() {
        let mut config = Config::for_local(PathBuf::from("files"));
        config.session_key = Some("session-secret".to_string());
        config.stability.api_key = Some("sk-stability-secret".to_string());
        config.openai.api_key = Some("sk-openai-secret".to_string());
        config.storage = StorageConfig::S3 {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "s3-secret".to_string(),
            endpoint: "https://s3.test".to_string(),
            bucket: "media".to_string(),
            public_base_url: "https://cdn.test".to_string(),
        };

        let rendered = format!("{:?}", config);
        for secret in ["session-secret", "sk-stability-secret", "sk-openai-secret", "s3-secret"] {
            assert!(!rendered.contains(secret), "{secret} leaked: {rendered}");
        }
        assert!(rendered.contains("api_key_set: true"));
        assert!(rendered.contains("bucket: \"media\""));
    }

    #[test]
    fn test_aspect_ratio_parse_is_case_insensitive() {
        assert_eq!(AspectRatio::parse(" Landscape "), AspectRatio::Landscape);
    }

    #[test]
    fn test_run_status_deserialization() {
        let status: RunStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, RunStatus::InProgress);

        let unknown: RunStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(unknown, RunStatus::Unknown);
        assert!(!unknown.is_failure());
    }

    #[test]
    fn test_run_status_failures() {
        assert!(RunStatus::Failed.is_failure());
        assert!(RunStatus::Cancelled.is_failure());
        assert!(RunStatus::Expired.is_failure());
        assert!(!RunStatus::Completed.is_failure());
        assert!(!RunStatus::Queued.is_failure());
    }

    #[test]
    fn test_forward_response_serialization_skips_empty_details() {
        let json = serde_json::to_value(ForwardResponse::failure("nope")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "nope", "content": ""})
        );
    }

    #[test]
    fn test_parse_timeout_secs() {
        assert_eq!(parse_timeout_secs("30").unwrap(), 30);
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("abc").is_err());
        assert!(parse_timeout_secs("601").is_err());
    }

    #[test]
    fn test_file_record_key() {
        let record = FileRecord {
            context_id: 5,
            component: "editor_ai".to_string(),
            area: "images".to_string(),
            item_id: 42,
            path: "/".to_string(),
            filename: "a.png".to_string(),
        };
        assert_eq!(record.key(), "5/editor_ai/images/42/a.png");
    }

    #[test]
    fn test_provider_settings_endpoint_trims_slash() {
        let settings = ProviderSettings {
            api_key: "k".to_string(),
            base_url: "https://api.example.com/".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            settings.endpoint("/v1/engines/list"),
            "https://api.example.com/v1/engines/list"
        );
    }
}
