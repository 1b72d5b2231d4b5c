//! Lexical relevance of a response to its prompt

use crate::config::RelevanceConfig;
use crate::error::Result;
use crate::scanner::{words, OutputScanner};
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;
use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "and", "any", "are", "but", "can", "could", "did", "does", "for",
    "from", "had", "has", "have", "her", "his", "how", "into", "its", "just", "may", "more",
    "not", "our", "out", "she", "should", "such", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "was", "were", "what", "when", "where", "which",
    "who", "why", "will", "with", "would", "you", "your",
];

/// Term-frequency vector of content words (three or more characters)
fn term_vector(text: &str) -> HashMap<String, f32> {
    let mut vector = HashMap::new();
    for word in words(text) {
        if word.chars().count() >= 3 && !STOPWORDS.contains(&word.as_str()) {
            *vector.entry(word).or_insert(0.0) += 1.0;
        }
    }
    vector
}

/// Cosine similarity of the content-word vectors of `a` and `b`
pub fn similarity(a: &str, b: &str) -> f32 {
    let va = term_vector(a);
    let vb = term_vector(b);
    if va.is_empty() || vb.is_empty() {
        return 0.0;
    }

    let dot: f32 = va
        .iter()
        .filter_map(|(term, x)| vb.get(term).map(|y| x * y))
        .sum();
    let norm = |v: &HashMap<String, f32>| v.values().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm(&va) * norm(&vb))
}

/// Invalid when the response shares too little vocabulary with the prompt
/// (similarity below `min_similarity`, default 0.1). Score is
/// `1 - similarity`. A prompt without content words cannot be compared and
/// always passes.
pub struct Relevance {
    min_similarity: f32,
}

impl Relevance {
    pub fn new(config: &RelevanceConfig) -> Self {
        Self {
            min_similarity: config.min_similarity,
        }
    }
}

#[async_trait]
impl OutputScanner for Relevance {
    fn name(&self) -> &'static str {
        "Relevance"
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
        if term_vector(prompt).is_empty() {
            return Ok(ScanResult::pass(output, 0.0));
        }

        let similarity = similarity(prompt, output);
        let score = 1.0 - similarity;
        if similarity >= self.min_similarity {
            Ok(ScanResult::pass(output, score))
        } else {
            Ok(ScanResult::fail(output, score))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_is_fully_similar() {
        let s = similarity("ansible playbook example", "ansible playbook example");
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_text() {
        assert_eq!(similarity("ansible playbook", "chocolate cake recipe"), 0.0);
    }

    #[tokio::test]
    async fn test_relevant_answer_passes() {
        let scanner = Relevance::new(&RelevanceConfig::default());
        let mut ctx = GuardContext::new();
        let result = scanner
            .scan(
                "Show me sample ansible code",
                "Here is sample ansible code: a playbook that installs nginx.",
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(result.valid);
        assert!(result.score < 0.9);
    }

    #[tokio::test]
    async fn test_off_topic_answer_fails() {
        let scanner = Relevance::new(&RelevanceConfig::default());
        let mut ctx = GuardContext::new();
        let result = scanner
            .scan(
                "Show me sample ansible code",
                "Bananas grow in tropical climates.",
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(!result.valid);
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn test_prompt_without_content_words_passes() {
        let scanner = Relevance::new(&RelevanceConfig::default());
        let mut ctx = GuardContext::new();
        let result = scanner.scan("Why?", "Because.", &mut ctx).await.unwrap();
        assert!(result.valid);
    }
}
