//! Scanner capabilities
//!
//! A scanner looks at one piece of text and returns a [`ScanResult`]. Input
//! scanners see the prompt; output scanners see the prompt (placeholders
//! restored) and the response. Per-request state, such as the anonymization
//! vault, is passed in through [`GuardContext`] so scanner instances stay
//! immutable and can be shared across prompts.

use crate::error::Result;
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;

/// Scanner applied to prompts before they reach a backend
#[async_trait]
pub trait InputScanner: Send + Sync {
    /// Stable name used in reports and score maps
    fn name(&self) -> &'static str;

    /// Whether this scanner may rewrite the prompt
    fn mode(&self) -> ScannerMode;

    /// Evaluate `prompt`
    async fn scan(&self, prompt: &str, ctx: &mut GuardContext) -> Result<ScanResult>;
}

/// Scanner applied to backend responses
#[async_trait]
pub trait OutputScanner: Send + Sync {
    /// Stable name used in reports and score maps
    fn name(&self) -> &'static str;

    /// Whether this scanner may rewrite the response
    fn mode(&self) -> ScannerMode;

    /// Evaluate `output` produced for `prompt`
    async fn scan(&self, prompt: &str, output: &str, ctx: &mut GuardContext)
        -> Result<ScanResult>;
}

/// Lowercased word tokens, used by the lexical scanners
pub(crate) fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
}

/// Fold curly apostrophes so phrase lists only need the ASCII form
pub(crate) fn normalize(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words() {
        let words: Vec<String> = words("Why is my boss such an ASSHOLE? I'm done.").collect();
        assert_eq!(
            words,
            vec!["why", "is", "my", "boss", "such", "an", "asshole", "i'm", "done"]
        );
    }

    #[test]
    fn test_normalize_apostrophes() {
        assert_eq!(normalize("I\u{2019}m Sorry"), "i'm sorry");
    }
}
