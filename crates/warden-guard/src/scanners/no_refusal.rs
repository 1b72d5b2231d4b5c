//! Detect responses where the model declined to answer

use crate::config::NoRefusalConfig;
use crate::error::Result;
use crate::scanner::{normalize, OutputScanner};
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;

const REFUSAL_PHRASES: &[(&str, f32)] = &[
    ("i must decline", 0.95),
    ("i'm sorry, but", 0.9),
    ("i am sorry, but", 0.9),
    ("against my guidelines", 0.9),
    ("i'm unable to", 0.85),
    ("i am unable to", 0.85),
    ("i apologize, but", 0.85),
    ("i cannot", 0.8),
    ("i can't", 0.8),
    ("i'm not able to", 0.8),
    ("i am not able to", 0.8),
    ("it is not appropriate", 0.8),
    ("it's not appropriate", 0.8),
    ("i won't be able to", 0.8),
    ("as an ai", 0.7),
    ("i'm sorry", 0.6),
];

/// Invalid when the strongest refusal phrase reaches the threshold
/// (default 0.75).
pub struct NoRefusal {
    threshold: f32,
}

impl NoRefusal {
    pub fn new(config: &NoRefusalConfig) -> Self {
        Self {
            threshold: config.threshold,
        }
    }

    pub fn score(output: &str) -> f32 {
        let text = normalize(output);
        REFUSAL_PHRASES
            .iter()
            .filter(|(phrase, _)| text.contains(phrase))
            .map(|(_, weight)| *weight)
            .fold(0.0, f32::max)
    }
}

#[async_trait]
impl OutputScanner for NoRefusal {
    fn name(&self) -> &'static str {
        "NoRefusal"
    }

    fn mode(&self) -> ScannerMode {
        ScannerMode::Validate
    }

    async fn scan(
        &self,
        _prompt: &str,
        output: &str,
        _ctx: &mut GuardContext,
    ) -> Result<ScanResult> {
        Ok(ScanResult::threshold(
            output,
            Self::score(output),
            self.threshold,
        ))
    }
}
