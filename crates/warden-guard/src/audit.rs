//! Audit logging for Guard

use crate::config::AuditConfig;
use crate::error::GuardError;
use crate::types::{AuditEntry, AuditResult, Direction, GuardContext, ScanReport};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;

use tracing::{info, warn};

/// Audit logger
pub struct AuditLogger {
    config: AuditConfig,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Log one scan pass over `content`
    pub fn log(
        &self,
        context: &GuardContext,
        direction: Direction,
        content: &str,
        result: std::result::Result<&ScanReport, &GuardError>,
        duration_ms: u64,
    ) {
        if !self.config.enabled {
            return;
        }

        let entry = AuditEntry {
            request_id: context.request_id,
            timestamp: context.timestamp,
            direction,
            content_hash: hash_content(content),
            result: audit_result(content, result),
            processing_time_ms: duration_ms,
        };

        self.emit(&entry, content);
    }

    fn emit(&self, entry: &AuditEntry, content: &str) {
        let content_field = if self.config.log_content {
            Some(truncate(content, 500))
        } else {
            None
        };

        info!(
            request_id = %entry.request_id,
            direction = %entry.direction,
            content_hash = %entry.content_hash,
            result = ?entry.result,
            processing_time_ms = entry.processing_time_ms,
            content = ?content_field,
            "Guard audit"
        );

        if let Some(ref path) = self.config.log_file {
            if let Err(e) = append_json_line(path, entry) {
                warn!(path = %path, error = %e, "Failed to write audit entry");
            }
        }
    }
}

fn audit_result(
    content: &str,
    result: std::result::Result<&ScanReport, &GuardError>,
) -> AuditResult {
    match result {
        Err(_) => AuditResult::Errored,
        Ok(report) if !report.is_valid() => AuditResult::Rejected {
            scanners: report.failures().into_iter().map(|f| f.scanner).collect(),
        },
        Ok(report) if report.sanitized != content => AuditResult::Transformed,
        Ok(_) => AuditResult::Passed,
    }
}

fn append_json_line(path: &str, entry: &AuditEntry) -> std::io::Result<()> {
    let json = serde_json::to_string(entry)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{json}")
}

/// Hash content for audit (privacy-preserving)
fn hash_content(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Truncate on a char boundary for logging
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}
