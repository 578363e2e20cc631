//! Editor dialog controller
//!
//! The client half of the two dialogs: build the form post, track the
//! in-flight spinner, and splice the returned markup into the document or
//! hold an error banner for a few seconds.

use crate::auth::{CAPABILITIES_HEADER, SESSION_KEY_HEADER, USER_ID_HEADER};
use crate::models::ForwardResponse;
use crate::{Error, Result};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long an error banner stays up.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Image,
    Text,
}

impl DialogKind {
    fn path(self) -> &'static str {
        match self {
            DialogKind::Image => "/image",
            DialogKind::Text => "/text",
        }
    }
}

/// One submission of a dialog.
#[derive(Debug, Clone)]
pub struct DialogRequest {
    kind: DialogKind,
    server: String,
    fields: Vec<(String, String)>,
    user_id: u64,
    capabilities: String,
    session_key: Option<String>,
}

impl DialogRequest {
    pub fn new(kind: DialogKind, server: &str, prompt: &str) -> Self {
        Self {
            kind,
            server: server.trim_end_matches('/').to_string(),
            fields: vec![
                ("action".to_string(), "generate".to_string()),
                ("prompt".to_string(), prompt.to_string()),
            ],
            user_id: 0,
            capabilities: String::new(),
            session_key: None,
        }
    }

    /// Adds an optional form field such as `aspectratio` or `context`.
    /// Empty values are left out so the server applies its defaults.
    pub fn option(mut self, name: &str, value: &str) -> Self {
        if !value.trim().is_empty() {
            self.fields.push((name.to_string(), value.to_string()));
        }
        self
    }

    pub fn identity(mut self, user_id: u64, capabilities: &str, session_key: Option<&str>) -> Self {
        self.user_id = user_id;
        self.capabilities = capabilities.to_string();
        self.session_key = session_key.map(str::to_string);
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub async fn send(&self, client: &reqwest::Client, timeout: Duration) -> Result<ForwardResponse> {
        let url = format!("{}{}", self.server, self.kind.path());
        let mut builder = client
            .post(&url)
            .timeout(timeout)
            .header(USER_ID_HEADER, self.user_id.to_string())
            .header(CAPABILITIES_HEADER, &self.capabilities)
            .form(&self.fields);
        if let Some(key) = &self.session_key {
            builder = builder.header(SESSION_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to reach {}: {}", url, e);
            e
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::UpstreamHttp {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse dialog response: {}\nBody: {}", e, body);
            Error::UpstreamProtocol(format!("Failed to parse dialog response: {}", e))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertionMode {
    #[default]
    Replace,
    Append,
}

impl InsertionMode {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "append" | "after" => InsertionMode::Append,
            _ => InsertionMode::Replace,
        }
    }
}

/// Splices `content` into `document` at the byte range `selection`.
///
/// `Replace` swaps out the selected text; `Append` keeps it and inserts
/// right after it. An empty selection is a cursor position.
pub fn insert(
    document: &str,
    selection: Range<usize>,
    content: &str,
    mode: InsertionMode,
) -> Result<String> {
    let Range { start, end } = selection;
    if start > end
        || end > document.len()
        || !document.is_char_boundary(start)
        || !document.is_char_boundary(end)
    {
        return Err(Error::validation(format!(
            "Selection {}..{} is not a valid range of the document",
            start, end
        )));
    }

    let (before, after) = match mode {
        InsertionMode::Replace => (&document[..start], &document[end..]),
        InsertionMode::Append => (&document[..end], &document[end..]),
    };

    let mut out = String::with_capacity(before.len() + content.len() + after.len());
    out.push_str(before);
    out.push_str(content);
    out.push_str(after);
    Ok(out)
}

/// Inline error shown under the prompt field.
#[derive(Debug, Clone)]
pub struct ErrorBanner {
    message: String,
    shown_at: Instant,
}

impl ErrorBanner {
    pub fn show(message: impl Into<String>) -> Self {
        Self::shown_at(message, Instant::now())
    }

    pub fn shown_at(message: impl Into<String>, shown_at: Instant) -> Self {
        Self {
            message: message.into(),
            shown_at,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_dismissed_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= BANNER_TIMEOUT
    }

    pub fn is_dismissed(&self) -> bool {
        self.is_dismissed_at(Instant::now())
    }
}

/// Clears the busy flag when the request finishes, however it finishes.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct DialogController {
    busy: Arc<AtomicBool>,
    banner: Option<ErrorBanner>,
    mode: InsertionMode,
}

impl DialogController {
    pub fn new(mode: InsertionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Shared handle the spinner watches.
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The current banner, if it has not timed out yet.
    pub fn banner(&self) -> Option<&ErrorBanner> {
        self.banner.as_ref().filter(|banner| !banner.is_dismissed())
    }

    /// Sends `request` and returns the updated document, or `None` after
    /// raising an error banner.
    pub async fn submit(
        &mut self,
        request: &DialogRequest,
        client: &reqwest::Client,
        timeout: Duration,
        document: &str,
        selection: Range<usize>,
    ) -> Option<String> {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::warn!("Dialog request already in flight");
            return None;
        }
        let guard = BusyGuard(Arc::clone(&self.busy));
        self.banner = None;

        let outcome = request.send(client, timeout).await;
        drop(guard);

        let content = match outcome {
            Ok(response) if response.success => response.content,
            Ok(response) => {
                self.banner = Some(ErrorBanner::show(response.error));
                return None;
            }
            Err(e) => {
                self.banner = Some(ErrorBanner::show(e.to_string()));
                return None;
            }
        };

        match insert(document, selection, &content, self.mode) {
            Ok(updated) => Some(updated),
            Err(e) => {
                self.banner = Some(ErrorBanner::show(e.to_string()));
                None
            }
        }
    }
}
