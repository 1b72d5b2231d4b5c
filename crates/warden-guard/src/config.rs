//! Configuration for Warden Guard
//!
//! [`GuardConfig`] tunes the scanners and can be loaded from TOML; every
//! field has a documented default so partial files work. [`BackendConfig`]
//! describes one completion endpoint and is read from `{NAME}_*` variables.

use crate::error::{GuardError, Result};
use crate::pii::EntityType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the guard pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Stop at the first invalid scanner instead of running them all
    pub fail_fast: bool,
    pub anonymize: AnonymizeConfig,
    pub toxicity: ToxicityConfig,
    pub token_limit: TokenLimitConfig,
    pub prompt_injection: PromptInjectionConfig,
    pub no_refusal: NoRefusalConfig,
    pub relevance: RelevanceConfig,
    pub sensitive: SensitiveConfig,
    pub moderation: ModerationConfig,
    pub audit: AuditConfig,
}

impl GuardConfig {
    /// Only anonymization and its reversal, nothing that can reject
    pub fn minimal() -> Self {
        Self {
            toxicity: ToxicityConfig {
                enabled: false,
                ..Default::default()
            },
            token_limit: TokenLimitConfig {
                enabled: false,
                ..Default::default()
            },
            prompt_injection: PromptInjectionConfig {
                enabled: false,
                ..Default::default()
            },
            no_refusal: NoRefusalConfig {
                enabled: false,
                ..Default::default()
            },
            relevance: RelevanceConfig {
                enabled: false,
                ..Default::default()
            },
            sensitive: SensitiveConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| GuardError::Config(e.to_string()))
    }
}

/// Anonymize (input) and deanonymize (output)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizeConfig {
    pub enabled: bool,
    /// Entity types replaced with placeholders
    pub entity_types: Vec<EntityType>,
    /// Names always treated as persons
    pub hidden_names: Vec<String>,
    /// Put original values back into responses
    pub restore_output: bool,
}

impl Default for AnonymizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entity_types: EntityType::ALL.to_vec(),
            hidden_names: vec![],
            restore_output: true,
        }
    }
}

/// Toxicity (input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToxicityConfig {
    pub enabled: bool,
    /// Scores at or above this are invalid
    pub threshold: f32,
    /// Extra terms, each scored 1.0
    pub custom_terms: Vec<String>,
}

impl Default for ToxicityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.5,
            custom_terms: vec![],
        }
    }
}

/// Token limit (input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenLimitConfig {
    pub enabled: bool,
    /// Maximum estimated tokens before truncation
    pub limit: usize,
}

impl Default for TokenLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 4096,
        }
    }
}

/// Prompt injection (input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptInjectionConfig {
    pub enabled: bool,
    /// Confidence at or above this is invalid (0.0-1.0)
    pub threshold: f32,
    /// Custom patterns to detect
    pub custom_patterns: Vec<String>,
}

impl Default for PromptInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.7,
            custom_patterns: vec![],
        }
    }
}

/// Refusal detection (output)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoRefusalConfig {
    pub enabled: bool,
    pub threshold: f32,
}

impl Default for NoRefusalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.75,
        }
    }
}

/// Relevance of response to prompt (output)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub enabled: bool,
    /// Minimum lexical similarity for a valid response
    pub min_similarity: f32,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_similarity: 0.1,
        }
    }
}

/// Sensitive content in responses (output)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitiveConfig {
    pub enabled: bool,
    /// Entity types that make a response invalid
    pub entity_types: Vec<EntityType>,
    /// Replace found entities in the sanitized response
    pub redact: bool,
}

impl Default for SensitiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // Person names are too common in ordinary answers to reject on
            entity_types: EntityType::ALL
                .into_iter()
                .filter(|t| *t != EntityType::Person)
                .collect(),
            redact: false,
        }
    }
}

/// Remote moderation classifier (input and output)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Disabled by default as it requires an external API
    pub enabled: bool,
    pub api_endpoint: String,
    pub api_key: Option<String>,
    /// Reject controversial content (not just unsafe)
    pub block_controversial: bool,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_endpoint: "http://localhost:8000/v1/guard".to_string(),
            api_key: None,
            block_controversial: false,
            timeout_ms: 5000,
        }
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    /// Log full content (vs. just hashes)
    pub log_content: bool,
    /// Append JSON lines to this file
    pub log_file: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_content: false, // Privacy by default
            log_file: None,
        }
    }
}

/// When and how a failed completion call is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 means one call per completion
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each later one
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

pub const DEFAULT_MAX_TOKENS: u32 = 5000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One OpenAI-compatible completion endpoint
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Display name, also the environment prefix (e.g. `MISTRAL`)
    pub name: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: u32,
    /// Fixed at 0.0 so repeated runs are comparable
    pub temperature: f32,
    /// Per-call timeout
    pub timeout: Duration,
    /// Verify TLS certificates
    pub tls_verify: bool,
    pub retry: RetryPolicy,
}

impl BackendConfig {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            tls_verify: true,
            retry: RetryPolicy::default(),
        }
    }

    /// Read `{name}_MODEL_NAME`, `{name}_API_URL`, `{name}_API_KEY` and the
    /// optional `{name}_MAX_TOKENS`, `{name}_TIMEOUT_SECS`,
    /// `{name}_TLS_VERIFY`, `{name}_MAX_RETRIES` from the process environment.
    pub fn from_env(name: &str) -> Result<Self> {
        Self::from_lookup(name, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary lookup
    pub fn from_lookup<F>(name: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = name.to_uppercase();
        let var = |suffix: &str| {
            let key = format!("{}_{}", prefix, suffix);
            let value = lookup(&key).map(|v| v.trim().to_string());
            (key, value.filter(|v| !v.is_empty()))
        };
        let required = |suffix: &str| match var(suffix) {
            (_, Some(value)) => Ok(value),
            (key, None) => Err(GuardError::ConfigMissing(key)),
        };

        let mut config = Self::new(
            prefix.clone(),
            required("MODEL_NAME")?,
            required("API_URL")?,
            required("API_KEY")?,
        );

        if let (key, Some(value)) = var("MAX_TOKENS") {
            config.max_tokens = parse(&key, &value)?;
        }
        if let (key, Some(value)) = var("TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse(&key, &value)?);
        }
        if let (key, Some(value)) = var("TLS_VERIFY") {
            config.tls_verify = parse_bool(&key, &value)?;
        }
        if let (key, Some(value)) = var("MAX_RETRIES") {
            config.retry.max_retries = parse(&key, &value)?;
        }

        if config.max_tokens == 0 {
            return Err(GuardError::Config(format!(
                "{}_MAX_TOKENS must be greater than zero",
                prefix
            )));
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| GuardError::Config(format!("{} has invalid value '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GuardError::Config(format!(
            "{} has invalid value '{}'",
            key, value
        ))),
    }
}
