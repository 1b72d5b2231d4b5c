//! Lexicon-based toxicity scoring

use crate::config::ToxicityConfig;
use crate::error::{GuardError, Result};
use crate::scanner::{normalize, InputScanner};
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;

/// Weighted insult and profanity terms. Weights are the score a single
/// occurrence produces; the scanner reports the highest matched weight.
const LEXICON: &[(&str, f32)] = &[
    ("kill yourself", 1.0),
    ("cunt", 1.0),
    ("motherfucker", 1.0),
    ("asshole", 0.9),
    ("bitch", 0.9),
    ("bitches", 0.9),
    ("fuck", 0.9),
    ("fucking", 0.85),
    ("bastard", 0.8),
    ("dickhead", 0.8),
    ("retard", 0.8),
    ("whore", 0.8),
    ("slut", 0.8),
    ("shit", 0.7),
    ("dick", 0.6),
    ("idiot", 0.6),
    ("moron", 0.6),
    ("pathetic", 0.5),
    ("stupid", 0.5),
    ("dumb", 0.45),
    ("hate", 0.4),
    ("crap", 0.3),
];

/// Flags prompts whose highest-weighted toxic term reaches the threshold
/// (default 0.5).
pub struct Toxicity {
    threshold: f32,
    pattern: Regex,
    weights: HashMap<String, f32>,
}

impl Toxicity {
    pub fn new(config: &ToxicityConfig) -> Result<Self> {
        let mut weights: HashMap<String, f32> = LEXICON
            .iter()
            .map(|(term, weight)| (term.to_string(), *weight))
            .collect();
        for term in &config.custom_terms {
            let term = normalize(term.trim());
            if !term.is_empty() {
                weights.insert(term, 1.0);
            }
        }

        // Longest first so phrases win over the words inside them
        let mut terms: Vec<&String> = weights.keys().collect();
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternation))
            .map_err(|e| GuardError::Config(format!("invalid toxicity term: {}", e)))?;

        Ok(Self {
            threshold: config.threshold,
            pattern,
            weights,
        })
    }

    /// Highest weight among matched terms, 0 when none match
    pub fn score(&self, text: &str) -> f32 {
        let text = normalize(text);
        self.pattern
            .find_iter(&text)
            .filter_map(|m| self.weights.get(m.as_str()).copied())
            .fold(0.0, f32::max)
    }
}

#[async_trait]
impl InputScanner for Toxicity {
    fn name(&self) -> &'static str {
        "Toxicity"
    }

    fn mode(&self) -> ScannerMode {
        ScannerMode::Validate
    }

    /// Scores the prompt with vault placeholders restored
    async fn scan(&self, prompt: &str, ctx: &mut GuardContext) -> Result<ScanResult> {
        let (original, _) = ctx.vault.restore(prompt);
        Ok(ScanResult::threshold(
            prompt,
            self.score(&original),
            self.threshold,
        ))
    }
}
