//! Guard pipeline: input scan, completion, output scan

use crate::audit::AuditLogger;
use crate::completion::CompletionBackend;
use crate::config::GuardConfig;
use crate::error::{GuardError, Result};
use crate::scanner::{InputScanner, OutputScanner};
use crate::scanners::{default_input_scanners, default_output_scanners};
use crate::types::{
    Direction, GuardContext, Outcome, PromptRun, ScanReport, ScanResult, ScannerMode,
    ScannerVerdict,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How the backends for one prompt are called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// One backend after another
    #[default]
    Sequential,
    /// All backends at once; results are still processed in backend order
    Concurrent,
}

/// Run `scanners` over `prompt` in declaration order.
///
/// Each scanner sees the text produced by the scanners before it. With
/// `fail_fast` the scan stops at the first invalid verdict.
pub async fn scan_prompt(
    scanners: &[Box<dyn InputScanner>],
    prompt: &str,
    ctx: &mut GuardContext,
    fail_fast: bool,
) -> Result<ScanReport> {
    let mut text = prompt.to_string();
    let mut verdicts = Vec::with_capacity(scanners.len());

    for scanner in scanners {
        let result = scanner.scan(&text, ctx).await?;
        let valid = apply(scanner.name(), scanner.mode(), result, &mut text, &mut verdicts)?;
        if !valid && fail_fast {
            break;
        }
    }

    Ok(ScanReport {
        sanitized: text,
        verdicts,
    })
}

/// Run `scanners` over `output` in declaration order; `prompt` is what the
/// response is judged against.
pub async fn scan_output(
    scanners: &[Box<dyn OutputScanner>],
    prompt: &str,
    output: &str,
    ctx: &mut GuardContext,
    fail_fast: bool,
) -> Result<ScanReport> {
    let mut text = output.to_string();
    let mut verdicts = Vec::with_capacity(scanners.len());

    for scanner in scanners {
        let result = scanner.scan(prompt, &text, ctx).await?;
        let valid = apply(scanner.name(), scanner.mode(), result, &mut text, &mut verdicts)?;
        if !valid && fail_fast {
            break;
        }
    }

    Ok(ScanReport {
        sanitized: text,
        verdicts,
    })
}

/// Record one scanner's result and thread its text forward
fn apply(
    name: &str,
    mode: ScannerMode,
    result: ScanResult,
    text: &mut String,
    verdicts: &mut Vec<ScannerVerdict>,
) -> Result<bool> {
    if mode == ScannerMode::Validate && result.sanitized != *text {
        return Err(GuardError::scanner(
            name,
            "validator returned modified text",
        ));
    }

    debug!(
        scanner = name,
        valid = result.valid,
        score = result.score,
        "Scanner finished"
    );

    verdicts.push(ScannerVerdict {
        scanner: name.to_string(),
        mode,
        valid: result.valid,
        score: result.score,
    });
    *text = result.sanitized;
    Ok(result.valid)
}

/// Ordered input and output scanners around one or more completion backends
pub struct Guard {
    fail_fast: bool,
    input_scanners: Vec<Box<dyn InputScanner>>,
    output_scanners: Vec<Box<dyn OutputScanner>>,
    audit: AuditLogger,
}

impl Guard {
    /// Guard with the built-in scanners enabled by `config`
    pub fn new(config: GuardConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> GuardBuilder {
        GuardBuilder::new()
    }

    /// Names of the input scanners, in the order they run
    pub fn input_scanner_names(&self) -> Vec<&'static str> {
        self.input_scanners.iter().map(|s| s.name()).collect()
    }

    /// Names of the output scanners, in the order they run
    pub fn output_scanner_names(&self) -> Vec<&'static str> {
        self.output_scanners.iter().map(|s| s.name()).collect()
    }

    /// Scan a prompt and write an audit entry
    pub async fn scan_input(&self, prompt: &str, ctx: &mut GuardContext) -> Result<ScanReport> {
        let start = Instant::now();
        let result = scan_prompt(&self.input_scanners, prompt, ctx, self.fail_fast).await;
        self.audit.log(
            ctx,
            Direction::Input,
            prompt,
            result.as_ref(),
            start.elapsed().as_millis() as u64,
        );
        result
    }

    /// Scan a response and write an audit entry
    pub async fn scan_output(
        &self,
        prompt: &str,
        output: &str,
        ctx: &mut GuardContext,
    ) -> Result<ScanReport> {
        let start = Instant::now();
        let result = scan_output(&self.output_scanners, prompt, output, ctx, self.fail_fast).await;
        self.audit.log(
            ctx,
            Direction::Output,
            output,
            result.as_ref(),
            start.elapsed().as_millis() as u64,
        );
        result
    }

    /// Guarded completion against a single backend.
    ///
    /// Returns the sanitized response, or [`GuardError::InputRejected`] /
    /// [`GuardError::OutputRejected`] / [`GuardError::Backend`].
    pub async fn complete(&self, backend: &dyn CompletionBackend, prompt: &str) -> Result<String> {
        let mut ctx = GuardContext::new();

        let input = self.scan_input(prompt, &mut ctx).await?;
        if !input.is_valid() {
            return Err(GuardError::InputRejected {
                failures: input.failures(),
            });
        }

        let response = backend.complete(&input.sanitized).await?;

        let (asked, _) = ctx.vault.restore(&input.sanitized);
        let output = self.scan_output(&asked, &response, &mut ctx).await?;
        if !output.is_valid() {
            return Err(GuardError::OutputRejected {
                failures: output.failures(),
            });
        }

        Ok(output.sanitized)
    }

    /// Run one prompt against every backend and collect one [`Outcome`] per
    /// backend, in backend order.
    ///
    /// Backends are only called when the prompt passes input scanning. A
    /// failing backend never stops the others.
    pub async fn run(
        &self,
        prompt: &str,
        backends: &[Arc<dyn CompletionBackend>],
        dispatch: Dispatch,
    ) -> PromptRun {
        let mut ctx = GuardContext::new();
        info!(request_id = %ctx.request_id, backends = backends.len(), "Scanning prompt");

        let input = match self.scan_input(prompt, &mut ctx).await {
            Ok(report) => report,
            Err(e) => {
                warn!(request_id = %ctx.request_id, error = %e, "Input scan failed");
                let error = e.to_string();
                return PromptRun {
                    request_id: ctx.request_id,
                    prompt: prompt.to_string(),
                    input: None,
                    outcomes: backends
                        .iter()
                        .map(|b| Outcome::ScanError {
                            backend: b.name().to_string(),
                            direction: Direction::Input,
                            error: error.clone(),
                        })
                        .collect(),
                };
            }
        };

        if !input.is_valid() {
            let failures = input.failures();
            info!(
                request_id = %ctx.request_id,
                failures = ?failures,
                "Prompt rejected, no backend called"
            );
            return PromptRun {
                request_id: ctx.request_id,
                prompt: prompt.to_string(),
                outcomes: backends
                    .iter()
                    .map(|b| Outcome::RejectedInput {
                        backend: b.name().to_string(),
                        failures: failures.clone(),
                    })
                    .collect(),
                input: Some(input),
            };
        }

        let sanitized = input.sanitized.clone();
        let completions = match dispatch {
            Dispatch::Sequential => {
                let mut completions = Vec::with_capacity(backends.len());
                for backend in backends {
                    completions.push(backend.complete(&sanitized).await);
                }
                completions
            }
            Dispatch::Concurrent => join_all(backends.iter().map(|b| b.complete(&sanitized))).await,
        };

        // Responses come back deanonymized, so judge them against the prompt
        // as the user wrote it
        let (asked, _) = ctx.vault.restore(&sanitized);

        let mut outcomes = Vec::with_capacity(backends.len());
        for (backend, completion) in backends.iter().zip(completions) {
            let name = backend.name().to_string();
            let outcome = match completion {
                Err(e) => Outcome::BackendError {
                    backend: name,
                    error: e.to_string(),
                },
                Ok(response) => match self.scan_output(&asked, &response, &mut ctx).await {
                    Err(e) => Outcome::ScanError {
                        backend: name,
                        direction: Direction::Output,
                        error: e.to_string(),
                    },
                    Ok(report) if report.is_valid() => Outcome::Accepted {
                        backend: name,
                        response,
                        report,
                    },
                    Ok(report) => Outcome::RejectedOutput {
                        backend: name,
                        response,
                        report,
                    },
                },
            };

            info!(
                request_id = %ctx.request_id,
                backend = outcome.backend(),
                state = outcome.state(),
                "Backend finished"
            );
            outcomes.push(outcome);
        }

        PromptRun {
            request_id: ctx.request_id,
            prompt: prompt.to_string(),
            input: Some(input),
            outcomes,
        }
    }
}

/// Builder for [`Guard`].
///
/// Scanners added explicitly replace the built-in set for that direction and
/// run in the order they were added.
pub struct GuardBuilder {
    config: GuardConfig,
    input_scanners: Vec<Box<dyn InputScanner>>,
    output_scanners: Vec<Box<dyn OutputScanner>>,
}

impl Default for GuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardBuilder {
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
            input_scanners: vec![],
            output_scanners: vec![],
        }
    }

    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn input_scanner(mut self, scanner: impl InputScanner + 'static) -> Self {
        self.input_scanners.push(Box::new(scanner));
        self
    }

    pub fn output_scanner(mut self, scanner: impl OutputScanner + 'static) -> Self {
        self.output_scanners.push(Box::new(scanner));
        self
    }

    /// Stop scanning at the first invalid verdict
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    pub fn build(self) -> Result<Guard> {
        let input_scanners = if self.input_scanners.is_empty() {
            default_input_scanners(&self.config)?
        } else {
            self.input_scanners
        };
        let output_scanners = if self.output_scanners.is_empty() {
            default_output_scanners(&self.config)?
        } else {
            self.output_scanners
        };

        Ok(Guard {
            fail_fast: self.config.fail_fast,
            input_scanners,
            output_scanners,
            audit: AuditLogger::new(self.config.audit),
        })
    }
}
