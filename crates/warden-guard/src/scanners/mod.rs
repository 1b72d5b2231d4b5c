//! Built-in scanners
//!
//! These are small deterministic heuristics with documented thresholds, not
//! learned classifiers. Anything implementing [`InputScanner`] or
//! [`OutputScanner`](crate::scanner::OutputScanner) can replace them.

pub mod anonymize;
pub mod deanonymize;
#[cfg(feature = "moderation")]
pub mod moderation;
pub mod no_refusal;
pub mod prompt_injection;
pub mod relevance;
pub mod sensitive;
pub mod token_limit;
pub mod toxicity;

pub use anonymize::Anonymize;
pub use deanonymize::Deanonymize;
#[cfg(feature = "moderation")]
pub use moderation::Moderation;
pub use no_refusal::NoRefusal;
pub use prompt_injection::PromptInjection;
pub use relevance::Relevance;
pub use sensitive::Sensitive;
pub use token_limit::TokenLimit;
pub use toxicity::Toxicity;

use crate::config::GuardConfig;
use crate::error::Result;
use crate::scanner::{InputScanner, OutputScanner};

/// Input scanners enabled by `config`, in pipeline order:
/// Anonymize, Toxicity, TokenLimit, PromptInjection, then Moderation.
pub fn default_input_scanners(config: &GuardConfig) -> Result<Vec<Box<dyn InputScanner>>> {
    let mut scanners: Vec<Box<dyn InputScanner>> = vec![];

    if config.anonymize.enabled {
        scanners.push(Box::new(Anonymize::new(&config.anonymize)?));
    }
    if config.toxicity.enabled {
        scanners.push(Box::new(Toxicity::new(&config.toxicity)?));
    }
    if config.token_limit.enabled {
        scanners.push(Box::new(TokenLimit::new(&config.token_limit)));
    }
    if config.prompt_injection.enabled {
        scanners.push(Box::new(PromptInjection::new(&config.prompt_injection)));
    }
    #[cfg(feature = "moderation")]
    if config.moderation.enabled {
        scanners.push(Box::new(Moderation::new(&config.moderation)?));
    }

    Ok(scanners)
}

/// Output scanners enabled by `config`, in pipeline order:
/// Deanonymize, NoRefusal, Relevance, Sensitive, then Moderation.
pub fn default_output_scanners(config: &GuardConfig) -> Result<Vec<Box<dyn OutputScanner>>> {
    let mut scanners: Vec<Box<dyn OutputScanner>> = vec![];

    if config.anonymize.enabled && config.anonymize.restore_output {
        scanners.push(Box::new(Deanonymize));
    }
    if config.no_refusal.enabled {
        scanners.push(Box::new(NoRefusal::new(&config.no_refusal)));
    }
    if config.relevance.enabled {
        scanners.push(Box::new(Relevance::new(&config.relevance)));
    }
    if config.sensitive.enabled {
        scanners.push(Box::new(Sensitive::new(&config.sensitive)?));
    }
    #[cfg(feature = "moderation")]
    if config.moderation.enabled {
        scanners.push(Box::new(Moderation::new(&config.moderation)?));
    }

    Ok(scanners)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let config = GuardConfig::default();
        let input: Vec<&str> = default_input_scanners(&config)
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        let output: Vec<&str> = default_output_scanners(&config)
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();

        assert_eq!(input, vec!["Anonymize", "Toxicity", "TokenLimit", "PromptInjection"]);
        assert_eq!(output, vec!["Deanonymize", "NoRefusal", "Relevance", "Sensitive"]);
    }

    #[test]
    fn test_restore_output_policy_drops_deanonymize() {
        let mut config = GuardConfig::default();
        config.anonymize.restore_output = false;
        let output = default_output_scanners(&config).unwrap();
        assert!(output.iter().all(|s| s.name() != "Deanonymize"));
    }

    #[test]
    fn test_minimal_config() {
        let config = GuardConfig::minimal();
        assert_eq!(default_input_scanners(&config).unwrap().len(), 1);
        assert_eq!(default_output_scanners(&config).unwrap().len(), 1);
    }
}
