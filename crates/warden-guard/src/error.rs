//! Error types for Warden Guard

use crate::types::ScanFailure;
use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Guard error types
#[derive(Debug, Error)]
pub enum GuardError {
    /// One or more input scanners marked the prompt invalid
    #[error("Prompt rejected by {}", describe(.failures))]
    InputRejected { failures: Vec<ScanFailure> },

    /// One or more output scanners marked a response invalid
    #[error("Output rejected by {}", describe(.failures))]
    OutputRejected { failures: Vec<ScanFailure> },

    /// Completion endpoint failed (network, timeout, HTTP status, bad body)
    #[error("Backend {backend} failed: {cause}")]
    Backend { backend: String, cause: String },

    /// A required configuration value is absent or empty
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// A configuration value is present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// A scanner failed or broke its declared contract
    #[error("Scanner {scanner} failed: {message}")]
    Scanner { scanner: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GuardError {
    /// Scanner failures carried by a rejection, empty for other errors
    pub fn failures(&self) -> &[ScanFailure] {
        match self {
            GuardError::InputRejected { failures } | GuardError::OutputRejected { failures } => {
                failures
            }
            _ => &[],
        }
    }

    /// Whether this error is a per-prompt rejection rather than a fault
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GuardError::InputRejected { .. } | GuardError::OutputRejected { .. }
        )
    }

    pub(crate) fn backend(backend: impl Into<String>, cause: impl ToString) -> Self {
        GuardError::Backend {
            backend: backend.into(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn scanner(scanner: impl Into<String>, message: impl Into<String>) -> Self {
        GuardError::Scanner {
            scanner: scanner.into(),
            message: message.into(),
        }
    }
}

fn describe(failures: &[ScanFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} (score: {:.2})", f.scanner, f.score))
        .collect::<Vec<_>>()
        .join(", ")
}
