//! Truncate prompts that exceed a token budget

use crate::config::TokenLimitConfig;
use crate::error::Result;
use crate::scanner::InputScanner;
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;
use tracing::debug;

/// Characters per token used for estimation
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimated token count: one token per four characters, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Cuts prompts longer than `limit` estimated tokens (default 4096) and
/// marks them invalid with score 1.0.
pub struct TokenLimit {
    limit: usize,
}

impl TokenLimit {
    pub fn new(config: &TokenLimitConfig) -> Self {
        Self {
            limit: config.limit,
        }
    }
}

#[async_trait]
impl InputScanner for TokenLimit {
    fn name(&self) -> &'static str {
        "TokenLimit"
    }

    fn mode(&self) -> ScannerMode {
        ScannerMode::Transform
    }

    async fn scan(&self, prompt: &str, _ctx: &mut GuardContext) -> Result<ScanResult> {
        let tokens = estimate_tokens(prompt);
        if tokens <= self.limit {
            return Ok(ScanResult::pass(prompt, 0.0));
        }

        let truncated: String = prompt.chars().take(self.limit * CHARS_PER_TOKEN).collect();
        debug!(tokens, limit = self.limit, "Prompt truncated to token limit");
        Ok(ScanResult::fail(truncated, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // Counted in characters, not bytes
        assert_eq!(estimate_tokens("ééééé"), 2);
    }

    #[tokio::test]
    async fn test_within_limit() {
        let scanner = TokenLimit::new(&TokenLimitConfig::default());
        let mut ctx = GuardContext::new();
        let result = scanner.scan("short prompt", &mut ctx).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.sanitized, "short prompt");
    }

    #[tokio::test]
    async fn test_over_limit_truncates() {
        let scanner = TokenLimit::new(&TokenLimitConfig {
            enabled: true,
            limit: 2,
        });
        let mut ctx = GuardContext::new();
        let result = scanner.scan("ééééééééééé", &mut ctx).await.unwrap();

        assert!(!result.valid);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.sanitized.chars().count(), 8);
    }
}
