//! Startup configuration
//!
//! Everything is read once here; nothing below `main` touches the
//! environment again.

use anyhow::{Context, Result};
use std::path::Path;
use warden_guard::{BackendConfig, GuardConfig};

/// Backends and guard tuning for one invocation
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub backends: Vec<BackendConfig>,
    pub guard: GuardConfig,
}

impl AppSettings {
    /// Read backend settings from the process environment and the guard
    /// config from `config_path` (defaults when absent)
    pub fn load(names: &[String], config_path: Option<&Path>) -> Result<Self> {
        Self::from_lookup(names, config_path, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(names: &[String], config_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if names.is_empty() {
            anyhow::bail!("at least one backend is required");
        }

        let backends = names
            .iter()
            .map(|name| {
                BackendConfig::from_lookup(name, &lookup)
                    .with_context(|| format!("backend {}", name.to_uppercase()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            backends,
            guard: load_guard_config(config_path)?,
        })
    }
}

/// Parse a TOML guard config, or the defaults without a path
pub fn load_guard_config(path: Option<&Path>) -> Result<GuardConfig> {
    let Some(path) = path else {
        return Ok(GuardConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading guard config {}", path.display()))?;
    GuardConfig::from_toml(&contents)
        .with_context(|| format!("parsing guard config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars() -> HashMap<String, String> {
        [
            ("MISTRAL_MODEL_NAME", "mistral"),
            ("MISTRAL_API_URL", "http://localhost:8001/v1"),
            ("MISTRAL_API_KEY", "m"),
            ("GRANITE_MODEL_NAME", "granite"),
            ("GRANITE_API_URL", "http://localhost:8002/v1"),
            ("GRANITE_API_KEY", "g"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_loads_backends_in_order() {
        let vars = vars();
        let names = vec!["mistral".to_string(), "GRANITE".to_string()];
        let settings = AppSettings::from_lookup(&names, None, |k| vars.get(k).cloned()).unwrap();

        let names: Vec<&str> = settings.backends.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["MISTRAL", "GRANITE"]);
        assert!(!settings.guard.fail_fast);
    }

    #[test]
    fn test_missing_backend_names_the_variable() {
        let vars = vars();
        let names = vec!["LLAMA".to_string()];
        let err = AppSettings::from_lookup(&names, None, |k| vars.get(k).cloned()).unwrap_err();
        assert!(format!("{:#}", err).contains("LLAMA_MODEL_NAME"));
    }

    #[test]
    fn test_guard_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[toxicity]\nthreshold = 0.9").unwrap();

        let config = load_guard_config(Some(file.path())).unwrap();
        assert_eq!(config.toxicity.threshold, 0.9);

        let err = load_guard_config(Some(Path::new("/nonexistent/guard.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading guard config"));
    }
}
