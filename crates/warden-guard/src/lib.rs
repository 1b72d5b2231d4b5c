//! # Warden Guard
//!
//! Guarded completions: every prompt passes an ordered set of input scanners
//! before it reaches an OpenAI-compatible completion endpoint, and every
//! response passes an ordered set of output scanners before it is reported.
//!
//! - **Anonymization**: person names, SSNs, cards, emails, phones, IPs and API
//!   keys are swapped for `[REDACTED_*]` placeholders and restored afterwards
//! - **Validation**: toxicity, token limit, prompt injection, refusals,
//!   relevance and sensitive data, each with a documented threshold
//! - **Moderation**: optional remote classifier over HTTP
//! - **Audit**: one structured `tracing` event per scan
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_guard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let guard = Guard::new(GuardConfig::default())?;
//!     let backend: Arc<dyn CompletionBackend> =
//!         Arc::new(OpenAiCompletionClient::new(BackendConfig::from_env("MISTRAL")?)?);
//!
//!     let run = guard
//!         .run("Show me sample ansible code", &[backend], Dispatch::Sequential)
//!         .await;
//!
//!     for outcome in &run.outcomes {
//!         println!("{}: {}", outcome.backend(), outcome.state());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! prompt ──► input scanners ──► backend(s) ──► output scanners ──► outcome
//!              │                                    │
//!              └──── GuardContext (vault) ──────────┘
//! ```

pub mod audit;
pub mod completion;
pub mod config;
pub mod error;
pub mod pii;
pub mod pipeline;
pub mod scanner;
pub mod scanners;
pub mod types;
pub mod vault;

pub use completion::{CompletionBackend, OpenAiCompletionClient};
pub use config::{BackendConfig, GuardConfig, RetryPolicy};
pub use error::{GuardError, Result};
pub use pipeline::{scan_output, scan_prompt, Dispatch, Guard, GuardBuilder};
pub use scanner::{InputScanner, OutputScanner};
pub use types::*;
pub use vault::Vault;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::completion::{CompletionBackend, OpenAiCompletionClient};
    pub use crate::config::{BackendConfig, GuardConfig};
    pub use crate::error::{GuardError, Result};
    pub use crate::pipeline::{Dispatch, Guard};
    pub use crate::scanner::{InputScanner, OutputScanner};
    pub use crate::types::*;
}
