//! Console rendering of prompt runs

use std::collections::BTreeMap;
use std::io::{self, Write};
use warden_guard::{Direction, Outcome, PromptRun, ScanFailure};

const SEPARATOR_WIDTH: usize = 50;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per prompt
    Json,
}

/// Writes each [`PromptRun`] as soon as it is complete
pub struct Reporter<W: Write> {
    out: W,
    format: Format,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: Format) -> Self {
        Self { out, format }
    }

    pub fn report(&mut self, run: &PromptRun) -> io::Result<()> {
        match self.format {
            Format::Text => self.text(run)?,
            Format::Json => {
                serde_json::to_writer(&mut self.out, run)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn text(&mut self, run: &PromptRun) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(out, "Testing prompt: {}", run.prompt)?;

        match &run.input {
            None => {
                if let Some(Outcome::ScanError { error, .. }) = run.outcomes.first() {
                    writeln!(out, "Prompt scan failed: {}", error)?;
                }
            }
            Some(input) if !input.is_valid() => {
                issues(out, "prompt", &input.failures())?;
                writeln!(
                    out,
                    "Prompt '{}' is not valid, scores: {}",
                    run.prompt,
                    scores(&input.score_map())
                )?;
            }
            Some(input) => {
                writeln!(out, "Sanitized Prompt: {}", input.sanitized)?;
                for outcome in &run.outcomes {
                    writeln!(out, "{} Response:", display_name(outcome.backend()))?;
                    match outcome {
                        Outcome::Accepted { report, .. } => {
                            writeln!(out, "Sanitized Output: {}", report.sanitized)?;
                        }
                        Outcome::RejectedOutput {
                            response, report, ..
                        } => {
                            issues(out, "output", &report.failures())?;
                            writeln!(
                                out,
                                "Output '{}' is not valid, scores: {}",
                                response,
                                scores(&report.score_map())
                            )?;
                        }
                        Outcome::BackendError { error, .. } => {
                            writeln!(out, "Backend error: {}", error)?;
                        }
                        Outcome::ScanError {
                            direction, error, ..
                        } => {
                            let what = match direction {
                                Direction::Input => "Prompt",
                                Direction::Output => "Output",
                            };
                            writeln!(out, "{} scan failed: {}", what, error)?;
                        }
                        // Unreachable once the prompt passed
                        Outcome::RejectedInput { .. } => {}
                    }
                }
            }
        }

        writeln!(out, "\n{}\n", "-".repeat(SEPARATOR_WIDTH))
    }
}

fn issues(out: &mut impl Write, what: &str, failures: &[ScanFailure]) -> io::Result<()> {
    for failure in failures {
        writeln!(
            out,
            "The {} contains a potential issue: {} (Score: {:.2})",
            what, failure.scanner, failure.score
        )?;
    }
    Ok(())
}

fn scores(map: &BTreeMap<String, f32>) -> String {
    let parts: Vec<String> = map
        .iter()
        .map(|(name, score)| format!("'{}': {:.2}", name, score))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

/// `MISTRAL` -> `Mistral`
pub fn display_name(backend: &str) -> String {
    let lower = backend.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_guard::{GuardContext, ScanReport, ScannerMode, ScannerVerdict};

    fn run(prompt: &str, input: Option<ScanReport>, outcomes: Vec<Outcome>) -> PromptRun {
        PromptRun {
            request_id: GuardContext::new().request_id,
            prompt: prompt.to_string(),
            input,
            outcomes,
        }
    }

    fn report(text: &str, verdicts: &[(&str, bool, f32)]) -> ScanReport {
        ScanReport {
            sanitized: text.to_string(),
            verdicts: verdicts
                .iter()
                .map(|(name, valid, score)| ScannerVerdict {
                    scanner: name.to_string(),
                    mode: ScannerMode::Validate,
                    valid: *valid,
                    score: *score,
                })
                .collect(),
        }
    }

    fn render(run: &PromptRun, format: Format) -> String {
        let mut reporter = Reporter::new(Vec::new(), format);
        reporter.report(run).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("MISTRAL"), "Mistral");
        assert_eq!(display_name("granite"), "Granite");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_rejected_prompt_text() {
        let input = report(
            "bad",
            &[("Toxicity", true, 0.0), ("PromptInjection", false, 1.0)],
        );
        let run = run(
            "bad",
            Some(input),
            vec![Outcome::RejectedInput {
                backend: "MISTRAL".to_string(),
                failures: vec![],
            }],
        );

        let text = render(&run, Format::Text);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Testing prompt: bad");
        assert_eq!(
            lines[1],
            "The prompt contains a potential issue: PromptInjection (Score: 1.00)"
        );
        assert_eq!(
            lines[2],
            "Prompt 'bad' is not valid, scores: {'PromptInjection': 1.00, 'Toxicity': 0.00}"
        );
        assert!(text.contains(&"-".repeat(50)));
        assert!(!text.contains("Response:"));
    }

    #[test]
    fn test_outcomes_text_in_backend_order() {
        let run = run(
            "hi",
            Some(report("hi", &[])),
            vec![
                Outcome::BackendError {
                    backend: "MISTRAL".to_string(),
                    error: "Backend MISTRAL failed: timed out".to_string(),
                },
                Outcome::Accepted {
                    backend: "GRANITE".to_string(),
                    response: "hello".to_string(),
                    report: report("hello", &[("NoRefusal", true, 0.0)]),
                },
            ],
        );

        let text = render(&run, Format::Text);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            &lines[..6],
            &[
                "Testing prompt: hi",
                "Sanitized Prompt: hi",
                "Mistral Response:",
                "Backend error: Backend MISTRAL failed: timed out",
                "Granite Response:",
                "Sanitized Output: hello",
            ]
        );
    }

    #[test]
    fn test_json_is_one_line_per_run() {
        let run = run("hi", Some(report("hi", &[])), vec![]);
        let json = render(&run, Format::Json);
        assert_eq!(json.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["prompt"], "hi");
    }
}
