//! Guarded completion runner
//!
//! Runs prompts through input scanners, every configured OpenAI-compatible
//! backend, and output scanners:
//! - `warden` runs the built-in prompt list against MISTRAL and GRANITE
//! - `warden probe` sends one prompt to one backend without guarding

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use warden_cli::{probe, AppSettings, Driver, Format, Reporter, DEFAULT_PROBE_PROMPT, DEFAULT_PROMPTS};
use warden_guard::{BackendConfig, CompletionBackend, Dispatch, Guard, OpenAiCompletionClient};

/// Guarded completion runner arguments
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Run prompts through guarded OpenAI-compatible completion backends")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Backend environment prefix, e.g. MISTRAL reads MISTRAL_API_URL
    #[arg(short, long = "backend", default_values = ["MISTRAL", "GRANITE"])]
    backends: Vec<String>,

    /// Guard configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Call all backends for a prompt at once
    #[arg(long)]
    parallel: bool,

    /// Stop scanning at the first invalid scanner
    #[arg(long)]
    fail_fast: bool,

    /// Prompt to test; repeat for several (default: built-in list)
    #[arg(short, long = "prompt")]
    prompts: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one prompt to one backend without guarding
    Probe {
        #[arg(short, long, default_value = "GRANITE")]
        backend: String,

        #[arg(short, long, default_value = DEFAULT_PROBE_PROMPT)]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    if let Some(Command::Probe { backend, prompt }) = args.command {
        let client = OpenAiCompletionClient::new(BackendConfig::from_env(&backend)?)?;
        probe(&client, &prompt, &mut std::io::stdout()).await?;
        return Ok(());
    }

    let mut settings = AppSettings::load(&args.backends, args.config.as_deref())?;
    if args.fail_fast {
        settings.guard.fail_fast = true;
    }

    let guard = Guard::new(settings.guard)?;
    info!(
        input = ?guard.input_scanner_names(),
        output = ?guard.output_scanner_names(),
        "Guard ready"
    );

    let backends = settings
        .backends
        .into_iter()
        .map(|config| {
            OpenAiCompletionClient::new(config)
                .map(|client| Arc::new(client) as Arc<dyn CompletionBackend>)
        })
        .collect::<warden_guard::Result<Vec<_>>>()?;

    let dispatch = if args.parallel {
        Dispatch::Concurrent
    } else {
        Dispatch::Sequential
    };

    let prompts = if args.prompts.is_empty() {
        DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
    } else {
        args.prompts
    };

    let driver = Driver::new(guard, backends, dispatch);
    let mut reporter = Reporter::new(std::io::stdout(), args.format);
    driver.run(&prompts, &mut reporter).await?;

    Ok(())
}
