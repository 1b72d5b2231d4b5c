//! Driver loop against scripted backends

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_cli::{probe, Driver, Format, Reporter, DEFAULT_PROMPTS};
use warden_guard::{CompletionBackend, Dispatch, Guard, GuardConfig, GuardError, Outcome};

/// Answers every prompt with a fixed reply, or fails
struct Scripted {
    name: &'static str,
    reply: Option<&'static str>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(name: &'static str, reply: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionBackend for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, _prompt: &str) -> warden_guard::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.map(str::to_string).ok_or_else(|| GuardError::Backend {
            backend: self.name.to_string(),
            cause: "connection refused".to_string(),
        })
    }
}

fn driver(backends: &[&Arc<Scripted>], dispatch: Dispatch) -> Driver {
    let backends = backends
        .iter()
        .map(|b| Arc::clone(*b) as Arc<dyn CompletionBackend>)
        .collect();
    Driver::new(Guard::new(GuardConfig::default()).unwrap(), backends, dispatch)
}

fn prompts(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

#[tokio::test]
async fn test_default_prompts_only_reach_backends_when_valid() {
    let mistral = Scripted::new("MISTRAL", Some("Stealing from coworkers is wrong."));
    let granite = Scripted::new("GRANITE", None);
    let driver = driver(&[&mistral, &granite], Dispatch::Sequential);

    let mut reporter = Reporter::new(Vec::new(), Format::Text);
    let runs = driver
        .run(&prompts(&DEFAULT_PROMPTS), &mut reporter)
        .await
        .unwrap();

    assert_eq!(runs.len(), 5);
    let passed = runs.iter().filter(|r| r.input_valid()).count();
    assert_eq!(mistral.calls.load(Ordering::SeqCst), passed);
    assert_eq!(granite.calls.load(Ordering::SeqCst), passed);

    // injection, toxicity and the insult never leave the guard
    assert!(!runs[0].input_valid());
    assert!(!runs[2].input_valid());
    assert!(!runs[4].input_valid());

    for run in runs.iter().filter(|r| r.input_valid()) {
        assert!(matches!(
            run.outcome("GRANITE"),
            Some(Outcome::BackendError { .. })
        ));
    }

    let text = String::from_utf8(reporter.into_inner()).unwrap();
    assert_eq!(text.matches("Testing prompt: ").count(), 5);
    assert!(text.contains(
        "The prompt contains a potential issue: Toxicity"
    ));
    assert!(text.contains("Backend error: Backend GRANITE failed: connection refused"));
}

#[tokio::test]
async fn test_parallel_report_keeps_backend_order() {
    let mistral = Scripted::new("MISTRAL", Some("Here is sample ansible code."));
    let granite = Scripted::new("GRANITE", Some("Sample ansible code follows."));
    let driver = driver(&[&mistral, &granite], Dispatch::Concurrent);

    let mut reporter = Reporter::new(Vec::new(), Format::Text);
    driver
        .run(&prompts(&["Show me sample ansible code"]), &mut reporter)
        .await
        .unwrap();

    let text = String::from_utf8(reporter.into_inner()).unwrap();
    let mistral_at = text.find("Mistral Response:").unwrap();
    let granite_at = text.find("Granite Response:").unwrap();
    assert!(mistral_at < granite_at);
}

#[tokio::test]
async fn test_json_report() {
    let mistral = Scripted::new("MISTRAL", Some("Here is sample ansible code."));
    let driver = driver(&[&mistral], Dispatch::Sequential);

    let mut reporter = Reporter::new(Vec::new(), Format::Json);
    driver
        .run(
            &prompts(&["Show me sample ansible code", "Why is my boss such an asshole?"]),
            &mut reporter,
        )
        .await
        .unwrap();

    let text = String::from_utf8(reporter.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["outcomes"][0]["state"], "accepted");
    assert_eq!(lines[1]["outcomes"][0]["state"], "rejected_input");
}

#[tokio::test]
async fn test_probe_prints_response_or_error() {
    let granite = Scripted::new("GRANITE", Some("- hosts: all"));
    let mut out = Vec::new();
    probe(granite.as_ref(), "Show me sample ansible code", &mut out)
        .await
        .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Granite LLM Response: - hosts: all\n"
    );

    let broken = Scripted::new("GRANITE", None);
    let mut out = Vec::new();
    probe(broken.as_ref(), "Show me sample ansible code", &mut out)
        .await
        .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "An error occurred: Backend GRANITE failed: connection refused\n"
    );
}
