//! Command-line driver for Warden Guard
//!
//! Reads backend settings from the environment, runs a list of prompts
//! through the guard and every backend, and prints what happened.

pub mod driver;
pub mod report;
pub mod settings;

pub use driver::{probe, Driver, DEFAULT_PROBE_PROMPT, DEFAULT_PROMPTS};
pub use report::{Format, Reporter};
pub use settings::AppSettings;
