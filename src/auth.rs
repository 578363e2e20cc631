//! Caller identity and capabilities
//!
//! The host application authenticates the user and forwards the result in
//! request headers. Each forwarder checks the capability it needs.

use crate::{Error, Result};
use axum::http::HeaderMap;
use std::collections::HashSet;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const CAPABILITIES_HEADER: &str = "x-capabilities";
pub const SESSION_KEY_HEADER: &str = "x-session-key";

const NOT_LOGGED_IN: &str = "You must be logged in";
const NO_PERMISSION: &str = "You do not have permission to use this feature.";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GenerateImage,
    GenerateText,
    ManageConfig,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::GenerateImage => "image:generate",
            Capability::GenerateText => "text:generate",
            Capability::ManageConfig => "config:manage",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "image:generate" => Some(Capability::GenerateImage),
            "text:generate" => Some(Capability::GenerateText),
            "config:manage" => Some(Capability::ManageConfig),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: u64,
    pub capabilities: HashSet<Capability>,
}

impl AuthContext {
    pub fn new(user_id: u64, capabilities: &[Capability]) -> Self {
        Self {
            user_id,
            capabilities: capabilities.iter().copied().collect(),
        }
    }

    /// Builds the context from forwarded headers. When `session_key` is set
    /// the caller must present the same value.
    pub fn from_headers(headers: &HeaderMap, session_key: Option<&str>) -> Result<Self> {
        if let Some(expected) = session_key {
            if header(headers, SESSION_KEY_HEADER) != Some(expected) {
                tracing::warn!("Rejected request with missing or wrong session key");
                return Err(Error::Unauthorized(NOT_LOGGED_IN.to_string()));
            }
        }

        let user_id = header(headers, USER_ID_HEADER)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| Error::Unauthorized(NOT_LOGGED_IN.to_string()))?;

        let capabilities = header(headers, CAPABILITIES_HEADER)
            .map(|raw| raw.split(',').filter_map(Capability::parse).collect())
            .unwrap_or_default();

        Ok(Self {
            user_id,
            capabilities,
        })
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.capabilities.contains(&capability) {
            Ok(())
        } else {
            tracing::warn!(
                "User {} lacks capability {}",
                self.user_id,
                capability.as_str()
            );
            Err(Error::Unauthorized(NO_PERMISSION.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_from_headers_parses_capabilities() {
        let ctx = AuthContext::from_headers(
            &headers(&[
                ("x-user-id", "42"),
                ("x-capabilities", "image:generate, text:generate,bogus"),
            ]),
            None,
        )
        .unwrap();

        assert_eq!(ctx.user_id, 42);
        assert!(ctx.require(Capability::GenerateImage).is_ok());
        assert!(ctx.require(Capability::GenerateText).is_ok());
        assert_eq!(
            ctx.require(Capability::ManageConfig).unwrap_err().to_string(),
            "You do not have permission to use this feature."
        );
    }

    #[test]
    fn test_missing_user_is_not_logged_in() {
        let err = AuthContext::from_headers(&headers(&[]), None).unwrap_err();
        assert_eq!(err.to_string(), "You must be logged in");

        let guest = AuthContext::from_headers(&headers(&[("x-user-id", "0")]), None);
        assert!(guest.is_err());
    }

    #[test]
    fn test_session_key_must_match() {
        let pairs = [("x-user-id", "1"), ("x-session-key", "wrong")];
        assert!(AuthContext::from_headers(&headers(&pairs), Some("right")).is_err());

        let pairs = [("x-user-id", "1"), ("x-session-key", "right")];
        assert!(AuthContext::from_headers(&headers(&pairs), Some("right")).is_ok());
    }
}
