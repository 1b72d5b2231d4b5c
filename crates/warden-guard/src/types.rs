//! Core types for Warden Guard

use crate::vault::Vault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome of a single scanner over a piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Text after this scanner (unchanged for validators)
    pub sanitized: String,
    /// Whether the text passed this scanner
    pub valid: bool,
    /// Risk score in `[0.0, 1.0]`, higher is riskier
    pub score: f32,
}

impl ScanResult {
    /// Text passes unchanged with the given score
    pub fn pass(text: impl Into<String>, score: f32) -> Self {
        Self {
            sanitized: text.into(),
            valid: true,
            score: clamp_score(score),
        }
    }

    /// Text fails this scanner with the given score
    pub fn fail(text: impl Into<String>, score: f32) -> Self {
        Self {
            sanitized: text.into(),
            valid: false,
            score: clamp_score(score),
        }
    }

    /// Pass or fail depending on `score < threshold`
    pub fn threshold(text: impl Into<String>, score: f32, threshold: f32) -> Self {
        if score < threshold {
            Self::pass(text, score)
        } else {
            Self::fail(text, score)
        }
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Whether a scanner may rewrite text or only judges it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScannerMode {
    /// May return text different from its input
    Transform,
    /// Must return its input unchanged
    Validate,
}

/// Verdict of one scanner inside a [`ScanReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerVerdict {
    pub scanner: String,
    pub mode: ScannerMode,
    pub valid: bool,
    pub score: f32,
}

/// A scanner that marked text invalid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub scanner: String,
    pub score: f32,
}

impl ScanFailure {
    pub fn new(scanner: impl Into<String>, score: f32) -> Self {
        Self {
            scanner: scanner.into(),
            score,
        }
    }
}

/// Aggregate result of running an ordered scanner set over one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Text after every scanner's transformation, in declaration order
    pub sanitized: String,
    /// Per-scanner verdicts in the order the scanners ran
    pub verdicts: Vec<ScannerVerdict>,
}

impl ScanReport {
    /// Logical AND over every scanner that ran
    pub fn is_valid(&self) -> bool {
        self.verdicts.iter().all(|v| v.valid)
    }

    /// Failing scanners, in the order they ran
    pub fn failures(&self) -> Vec<ScanFailure> {
        self.verdicts
            .iter()
            .filter(|v| !v.valid)
            .map(|v| ScanFailure::new(&v.scanner, v.score))
            .collect()
    }

    /// Validity keyed by scanner name
    pub fn valid_map(&self) -> BTreeMap<String, bool> {
        self.verdicts
            .iter()
            .map(|v| (v.scanner.clone(), v.valid))
            .collect()
    }

    /// Risk score keyed by scanner name
    pub fn score_map(&self) -> BTreeMap<String, f32> {
        self.verdicts
            .iter()
            .map(|v| (v.scanner.clone(), v.score))
            .collect()
    }
}

/// Direction of content flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Prompt on its way to a backend
    Input,
    /// Completion on its way back
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Request scope for one prompt: identity plus the reversible vault.
///
/// A context is created per prompt and dropped after the last backend's
/// output has been scanned, so placeholders never leak between prompts.
#[derive(Debug, Clone)]
pub struct GuardContext {
    /// Unique request ID
    pub request_id: Uuid,
    /// When the request started
    pub timestamp: DateTime<Utc>,
    /// Placeholder mapping shared by anonymize and deanonymize
    pub vault: Vault,
}

impl Default for GuardContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            vault: Vault::new(),
        }
    }
}

impl GuardContext {
    /// Create a new context with a fresh request ID and an empty vault
    pub fn new() -> Self {
        Self::default()
    }
}

/// Terminal state of one (prompt, backend) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// Input scanners rejected the prompt; the backend was never called
    RejectedInput {
        backend: String,
        failures: Vec<ScanFailure>,
    },
    /// The completion call failed
    BackendError { backend: String, error: String },
    /// Output scanners rejected the response
    RejectedOutput {
        backend: String,
        response: String,
        report: ScanReport,
    },
    /// Response passed every output scanner
    Accepted {
        backend: String,
        response: String,
        report: ScanReport,
    },
    /// A scanner itself failed, so no verdict could be reached
    ScanError {
        backend: String,
        direction: Direction,
        error: String,
    },
}

impl Outcome {
    /// Backend this outcome belongs to
    pub fn backend(&self) -> &str {
        match self {
            Outcome::RejectedInput { backend, .. }
            | Outcome::BackendError { backend, .. }
            | Outcome::RejectedOutput { backend, .. }
            | Outcome::Accepted { backend, .. }
            | Outcome::ScanError { backend, .. } => backend,
        }
    }

    /// Short state label used in logs
    pub fn state(&self) -> &'static str {
        match self {
            Outcome::RejectedInput { .. } => "rejected_input",
            Outcome::BackendError { .. } => "backend_error",
            Outcome::RejectedOutput { .. } => "rejected_output",
            Outcome::Accepted { .. } => "accepted",
            Outcome::ScanError { .. } => "scan_error",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }
}

/// Everything that happened to one prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRun {
    pub request_id: Uuid,
    pub prompt: String,
    /// Input scan, `None` when a scanner errored before a verdict
    pub input: Option<ScanReport>,
    /// One terminal outcome per configured backend, in configuration order
    pub outcomes: Vec<Outcome>,
}

impl PromptRun {
    /// Whether the prompt passed input scanning
    pub fn input_valid(&self) -> bool {
        self.input.as_ref().map(ScanReport::is_valid).unwrap_or(false)
    }

    /// Outcome for a named backend
    pub fn outcome(&self, backend: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.backend() == backend)
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Direction (input/output)
    pub direction: Direction,
    /// Original content hash
    pub content_hash: String,
    /// Result of scanning
    pub result: AuditResult,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Result for audit logging (simplified)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditResult {
    /// Content passed unchanged
    Passed,
    /// Content passed after transformation
    Transformed,
    /// Content rejected by the listed scanners
    Rejected { scanners: Vec<String> },
    /// A scanner failed
    Errored,
}
