//! Error handling and custom error types
//!
//! Provides unified error handling across the service using thiserror. Every
//! variant ends up as the `error` string of a `{success: false}` envelope.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("HTTP {status} - {message}")]
    UpstreamHttp { status: u16, message: String },

    #[error("Invalid response from upstream API: {0}")]
    UpstreamProtocol(String),

    #[error("Assistant run timed out after {0} seconds")]
    Timeout(u64),

    #[error("Assistant run {status}: {detail}")]
    RunTerminated { status: String, detail: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_http_display_includes_status() {
        let err = Error::UpstreamHttp {
            status: 401,
            message: "Incorrect API key".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401 - Incorrect API key");
    }

    #[test]
    fn test_validation_display_is_bare_message() {
        assert_eq!(
            Error::validation("API key is required").to_string(),
            "API key is required"
        );
    }
}
