//! Replace personal data in prompts with reversible placeholders

use crate::config::AnonymizeConfig;
use crate::error::{GuardError, Result};
use crate::pii::{max_confidence, replace_entities, PiiRecognizer};
use crate::scanner::InputScanner;
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

/// Swaps recognized entities for `[REDACTED_{TYPE}_{n}]` placeholders and
/// records each swap in the request's vault. Never rejects.
///
/// Placeholder-shaped text already in the prompt is reserved in the vault,
/// so it is neither reused nor rewritten on the way back.
pub struct Anonymize {
    recognizer: PiiRecognizer,
    placeholder_shape: Regex,
}

impl Anonymize {
    pub fn new(config: &AnonymizeConfig) -> Result<Self> {
        let placeholder_shape = Regex::new(r"\[REDACTED_[A-Z_]+_\d+\]")
            .map_err(|e| GuardError::Config(format!("invalid placeholder pattern: {}", e)))?;
        Ok(Self {
            recognizer: PiiRecognizer::new(
                config.entity_types.clone(),
                config.hidden_names.clone(),
            )?,
            placeholder_shape,
        })
    }
}

#[async_trait]
impl InputScanner for Anonymize {
    fn name(&self) -> &'static str {
        "Anonymize"
    }

    fn mode(&self) -> ScannerMode {
        ScannerMode::Transform
    }

    async fn scan(&self, prompt: &str, ctx: &mut GuardContext) -> Result<ScanResult> {
        let entities = self.recognizer.analyze(prompt);
        if entities.is_empty() {
            return Ok(ScanResult::pass(prompt, 0.0));
        }

        let vault = &mut ctx.vault;
        for literal in self.placeholder_shape.find_iter(prompt) {
            vault.reserve(literal.as_str());
        }
        let sanitized = replace_entities(prompt, &entities, |e| {
            vault.placeholder_for(e.entity_type, &e.value)
        });

        debug!(
            request_id = %ctx.request_id,
            entities = entities.len(),
            "Anonymized prompt"
        );

        Ok(ScanResult::pass(sanitized, max_confidence(&entities)))
    }
}
