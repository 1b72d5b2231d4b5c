//! Content moderation via an external guard classifier
//!
//! The classifier is any HTTP service that accepts chat-style messages and
//! answers with a safety level, e.g.
//! `{"safety": "Unsafe", "categories": ["Violent"], "refusal": null}`.
//! Only `safety` decides the verdict.

use crate::config::ModerationConfig;
use crate::error::{GuardError, Result};
use crate::scanner::{InputScanner, OutputScanner};
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Safety level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLevel {
    Safe,
    /// Content is controversial/context-dependent
    Controversial,
    Unsafe,
}

impl SafetyLevel {
    fn score(&self) -> f32 {
        match self {
            SafetyLevel::Safe => 0.0,
            SafetyLevel::Controversial => 0.5,
            SafetyLevel::Unsafe => 1.0,
        }
    }
}

#[derive(Debug, Serialize)]
struct ModerationRequest {
    messages: Vec<ModerationMessage>,
}

#[derive(Debug, Serialize)]
struct ModerationMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    safety: String,
}

/// Asks the classifier about prompts (as the user turn) and responses (as
/// the assistant turn). Invalid when unsafe, or controversial with
/// `block_controversial`. Classifier failures are scanner errors, never a
/// silent pass.
pub struct Moderation {
    config: ModerationConfig,
    client: reqwest::Client,
}

impl Moderation {
    pub fn new(config: &ModerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    /// Ask the classifier about `messages`
    async fn classify(&self, messages: Vec<ModerationMessage>) -> Result<SafetyLevel> {
        let mut req = self
            .client
            .post(&self.config.api_endpoint)
            .json(&ModerationRequest { messages });

        if let Some(ref api_key) = self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| GuardError::scanner("Moderation", format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GuardError::scanner(
                "Moderation",
                format!("API returned status: {}", response.status()),
            ));
        }

        let body: ModerationResponse = response.json().await.map_err(|e| {
            GuardError::scanner("Moderation", format!("Failed to parse response: {}", e))
        })?;

        Ok(parse_level(&body.safety))
    }

    fn judge(&self, text: &str, level: SafetyLevel) -> ScanResult {
        let blocked = match level {
            SafetyLevel::Unsafe => true,
            SafetyLevel::Controversial => self.config.block_controversial,
            SafetyLevel::Safe => false,
        };
        debug!(level = ?level, blocked, "Moderation verdict");
        let score = level.score();
        if blocked {
            ScanResult::fail(text, score)
        } else {
            ScanResult::pass(text, score)
        }
    }
}

#[async_trait]
impl InputScanner for Moderation {
    fn name(&self) -> &'static str {
        "Moderation"
    }

    fn mode(&self) -> ScannerMode {
        ScannerMode::Validate
    }

    async fn scan(&self, prompt: &str, _ctx: &mut GuardContext) -> Result<ScanResult> {
        let level = self
            .classify(vec![ModerationMessage {
                role: "user",
                content: prompt.to_string(),
            }])
            .await?;
        Ok(self.judge(prompt, level))
    }
}

#[async_trait]
impl OutputScanner for Moderation {
    fn name(&self) -> &'static str {
        "Moderation"
    }

    fn mode(&self) -> ScannerMode {
        ScannerMode::Validate
    }

    async fn scan(
        &self,
        prompt: &str,
        output: &str,
        _ctx: &mut GuardContext,
    ) -> Result<ScanResult> {
        let level = self
            .classify(vec![
                ModerationMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
                ModerationMessage {
                    role: "assistant",
                    content: output.to_string(),
                },
            ])
            .await?;
        Ok(self.judge(output, level))
    }
}

/// Unknown levels are treated as unsafe
fn parse_level(level: &str) -> SafetyLevel {
    match level.to_lowercase().as_str() {
        "safe" => SafetyLevel::Safe,
        "controversial" => SafetyLevel::Controversial,
        _ => SafetyLevel::Unsafe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_level_is_unsafe() {
        assert_eq!(parse_level("SAFE"), SafetyLevel::Safe);
        assert_eq!(parse_level("???"), SafetyLevel::Unsafe);
    }

    #[test]
    fn test_judge() {
        let scanner = Moderation::new(&ModerationConfig::default()).unwrap();
        assert!(!scanner.judge("x", SafetyLevel::Unsafe).valid);
        assert!(scanner.judge("x", SafetyLevel::Controversial).valid);
        assert!(scanner.judge("x", SafetyLevel::Safe).valid);

        let strict = Moderation::new(&ModerationConfig {
            block_controversial: true,
            ..Default::default()
        })
        .unwrap();
        let result = strict.judge("x", SafetyLevel::Controversial);
        assert!(!result.valid);
        assert_eq!(result.score, 0.5);
    }
}
