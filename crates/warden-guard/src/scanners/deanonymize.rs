//! Put anonymized values back into responses

use crate::error::Result;
use crate::scanner::OutputScanner;
use crate::types::{GuardContext, ScanResult, ScannerMode};
use async_trait::async_trait;
use tracing::debug;

/// Restores placeholders from the request's vault. Never rejects.
pub struct Deanonymize;

#[async_trait]
impl OutputScanner for Deanonymize {
    fn name(&self) -> &'static str {
        "Deanonymize"
    }

    fn mode(&self) -> ScannerMode {
        ScannerMode::Transform
    }

    async fn scan(
        &self,
        _prompt: &str,
        output: &str,
        ctx: &mut GuardContext,
    ) -> Result<ScanResult> {
        let (restored, count) = ctx.vault.restore(output);
        if count > 0 {
            debug!(request_id = %ctx.request_id, restored = count, "Deanonymized output");
        }
        Ok(ScanResult::pass(restored, 0.0))
    }
}
