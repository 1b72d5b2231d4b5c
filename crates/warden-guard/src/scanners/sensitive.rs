//! Detect personal data leaking out in responses

use crate::config::SensitiveConfig;
use crate::error::Result;
use crate::pii::{max_confidence, replace_entities, PiiRecognizer};
use crate::scanner::OutputScanner;
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;
use tracing::debug;

/// Invalid when the response contains any configured entity type.
/// With `redact` the sanitized text has those entities replaced by
/// `[REDACTED_{TYPE}]`.
pub struct Sensitive {
    recognizer: PiiRecognizer,
    redact: bool,
}

impl Sensitive {
    pub fn new(config: &SensitiveConfig) -> Result<Self> {
        Ok(Self {
            recognizer: PiiRecognizer::new(config.entity_types.clone(), vec![])?,
            redact: config.redact,
        })
    }
}

#[async_trait]
impl OutputScanner for Sensitive {
    fn name(&self) -> &'static str {
        "Sensitive"
    }

    fn mode(&self) -> ScannerMode {
        if self.redact {
            ScannerMode::Transform
        } else {
            ScannerMode::Validate
        }
    }

    async fn scan(
        &self,
        _prompt: &str,
        output: &str,
        ctx: &mut GuardContext,
    ) -> Result<ScanResult> {
        let entities = self.recognizer.analyze(output);
        if entities.is_empty() {
            return Ok(ScanResult::pass(output, 0.0));
        }

        debug!(
            request_id = %ctx.request_id,
            entities = ?entities.iter().map(|e| e.entity_type).collect::<Vec<_>>(),
            "Sensitive entities in output"
        );

        let text = if self.redact {
            replace_entities(output, &entities, |e| format!("[REDACTED_{}]", e.entity_type))
        } else {
            output.to_string()
        };
        Ok(ScanResult::fail(text, max_confidence(&entities)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ssn_in_output_is_flagged() {
        let scanner = Sensitive::new(&SensitiveConfig::default()).unwrap();
        let mut ctx = GuardContext::new();
        let result = scanner
            .scan("", "His SSN is 172-55-3546.", &mut ctx)
            .await
            .unwrap();

        assert!(!result.valid);
        assert_eq!(result.score, 0.85);
        assert_eq!(result.sanitized, "His SSN is 172-55-3546.");
        assert_eq!(scanner.mode(), ScannerMode::Validate);
    }

    #[tokio::test]
    async fn test_redact_mode() {
        let scanner = Sensitive::new(&SensitiveConfig {
            redact: true,
            ..Default::default()
        })
        .unwrap();
        let mut ctx = GuardContext::new();
        let result = scanner
            .scan("", "Write to test@example.com", &mut ctx)
            .await
            .unwrap();

        assert!(!result.valid);
        assert_eq!(result.sanitized, "Write to [REDACTED_EMAIL_ADDRESS]");
        assert_eq!(scanner.mode(), ScannerMode::Transform);
    }

    #[tokio::test]
    async fn test_names_alone_pass_by_default() {
        let scanner = Sensitive::new(&SensitiveConfig::default()).unwrap();
        let mut ctx = GuardContext::new();
        let result = scanner
            .scan("", "Peter Double is a fictional character.", &mut ctx)
            .await
            .unwrap();
        assert!(result.valid);
    }
}
