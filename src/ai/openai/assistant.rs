use super::client::OpenAiHttpClient;
use super::types::{
    Assistant, CreateRunRequest, CreateThreadRequest, MessageList, Run, Thread,
    ThreadMessageInput,
};
use crate::ai::{AssistantReport, AssistantService};
use crate::models::{AssistantRun, ProviderSettings, RunStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drives one assistant run per call: thread, run, poll, read messages.
pub struct OpenAiAssistantClient {
    http: OpenAiHttpClient,
    assistant_id: String,
    poll_interval: Duration,
}

impl OpenAiAssistantClient {
    pub fn new(settings: ProviderSettings, assistant_id: String) -> Self {
        Self::new_with_client(settings, assistant_id, reqwest::Client::new())
    }

    pub fn new_with_client(
        settings: ProviderSettings,
        assistant_id: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(settings, client),
            assistant_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn require_assistant_id(&self) -> Result<()> {
        if self.assistant_id.trim().is_empty() {
            return Err(Error::validation("Assistant ID is required"));
        }
        Ok(())
    }

    async fn start_run(&self, prompt: &str) -> Result<(AssistantRun, Run)> {
        let thread: Thread = self
            .http
            .post(
                "/v1/threads",
                &CreateThreadRequest {
                    messages: vec![ThreadMessageInput {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    }],
                },
            )
            .await?;
        tracing::debug!("Created thread {}", thread.id);

        let run: Run = self
            .http
            .post(
                &format!("/v1/threads/{}/runs", thread.id),
                &CreateRunRequest {
                    assistant_id: self.assistant_id.clone(),
                },
            )
            .await?;
        tracing::debug!("Created run {} ({})", run.id, run.status.as_str());

        let handle = AssistantRun {
            thread_id: thread.id,
            run_id: run.id.clone(),
            status: run.status,
        };
        Ok((handle, run))
    }

    /// Polls until the run completes. Abandoned runs are left to expire upstream.
    async fn wait_for_completion(&self, handle: &mut AssistantRun, initial: Run) -> Result<()> {
        let timeout = self.http.settings.timeout;
        let started = Instant::now();
        let mut run = initial;

        loop {
            handle.status = run.status;
            match run.status {
                RunStatus::Completed => return Ok(()),
                status if status.is_failure() => {
                    tracing::warn!(
                        "Run {} ended with status {}",
                        handle.run_id,
                        status.as_str()
                    );
                    return Err(Error::RunTerminated {
                        status: status.as_str().to_string(),
                        detail: run.failure_detail(),
                    });
                }
                _ => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                tracing::warn!(
                    "Run {} still {} after {:?}",
                    handle.run_id,
                    handle.status.as_str(),
                    elapsed
                );
                return Err(Error::Timeout(timeout.as_secs()));
            }

            tokio::time::sleep(self.poll_interval.min(timeout - elapsed)).await;

            // A slow status request may not push the loop past timeout + interval.
            let remaining = (timeout + self.poll_interval).saturating_sub(started.elapsed());
            let status_path = format!("/v1/threads/{}/runs/{}", handle.thread_id, handle.run_id);
            run = match tokio::time::timeout(remaining, self.http.get(&status_path)).await {
                Ok(run) => run?,
                Err(_) => {
                    tracing::warn!(
                        "Run {} status request outlived the deadline",
                        handle.run_id
                    );
                    return Err(Error::Timeout(timeout.as_secs()));
                }
            };
            tracing::debug!("Run {} status: {}", handle.run_id, run.status.as_str());
        }
    }

    async fn read_reply(&self, thread_id: &str) -> Result<String> {
        let messages: MessageList = self
            .http
            .get(&format!("/v1/threads/{}/messages", thread_id))
            .await?;

        let reply = messages
            .data
            .iter()
            .find(|message| message.role == "assistant")
            .map(|message| message.text())
            .ok_or_else(|| {
                Error::UpstreamProtocol("No assistant message in thread".to_string())
            })?;

        if reply.is_empty() {
            return Err(Error::UpstreamProtocol(
                "Assistant message has no text content".to_string(),
            ));
        }
        Ok(reply)
    }
}

#[async_trait]
impl AssistantService for OpenAiAssistantClient {
    async fn ask(&self, prompt: &str) -> Result<String> {
        self.require_assistant_id()?;

        let (mut handle, run) = self.start_run(prompt).await?;
        self.wait_for_completion(&mut handle, run).await?;
        self.read_reply(&handle.thread_id).await
    }

    async fn test_connection(&self) -> Result<AssistantReport> {
        self.require_assistant_id()?;

        let assistant: Assistant = self
            .http
            .get(&format!("/v1/assistants/{}", self.assistant_id))
            .await?;

        Ok(AssistantReport {
            id: assistant.id,
            name: assistant.name,
            model: assistant.model,
            created: assistant
                .created_at
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                .map(|created| created.format("%Y-%m-%d %H:%M:%S").to_string()),
        })
    }
}
