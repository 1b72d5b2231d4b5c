//! OpenAI-compatible completion backends

use crate::config::BackendConfig;
use crate::error::{GuardError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Something that turns a prompt into a completion
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Display name used in reports
    fn name(&self) -> &str;

    /// Complete `prompt`; errors are [`GuardError::Backend`]
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Request body for `POST {base_url}/completions`
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Why a single attempt failed, and whether another attempt may help
#[derive(Debug)]
struct AttemptError {
    message: String,
    retryable: bool,
}

impl AttemptError {
    fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

/// Non-streaming client for the legacy `/completions` endpoint
pub struct OpenAiCompletionClient {
    config: BackendConfig,
    client: reqwest::Client,
}

impl OpenAiCompletionClient {
    pub fn new(config: BackendConfig) -> Result<Self> {
        if !config.tls_verify {
            warn!(
                backend = %config.name,
                "TLS certificate verification disabled"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// `{base_url}/completions`, tolerating a trailing slash on the base
    pub fn endpoint(&self) -> String {
        format!("{}/completions", self.config.base_url.trim_end_matches('/'))
    }

    pub fn request_body<'a>(&'a self, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }

    async fn attempt(&self, prompt: &str) -> std::result::Result<String, AttemptError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "request failed" };
                AttemptError::transient(format!("{}: {}", kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status, body.trim());
            return Err(if status.is_server_error() {
                AttemptError::transient(message)
            } else {
                AttemptError::fatal(message)
            });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::fatal(format!("invalid response body: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| AttemptError::fatal("response contained no choices"))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let policy = self.config.retry;
        let mut attempt = 0;

        loop {
            match self.attempt(prompt).await {
                Ok(text) => {
                    debug!(backend = %self.config.name, attempt, chars = text.len(), "Completion received");
                    return Ok(text);
                }
                Err(err) if err.retryable && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = policy.backoff(attempt);
                    warn!(
                        backend = %self.config.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err.message,
                        "Completion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(GuardError::backend(&self.config.name, err.message)),
            }
        }
    }
}
