//! Store configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examkit_core::traits::ResultStore;

use crate::memory::MemoryStore;
use crate::rest::RestStore;

/// Configuration for the result store backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental
/// exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    Rest {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Rest { base_url, api_key } => f
                .debug_struct("Rest")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .finish(),
            StoreConfig::Memory => f.debug_struct("Memory").finish(),
        }
    }
}

/// Top-level examkit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamkitConfig {
    /// Result store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Question bank document.
    #[serde(default = "default_bank_path")]
    pub bank_path: PathBuf,
    /// Test duration in minutes.
    #[serde(default = "default_duration_mins")]
    pub test_duration_mins: u64,
    /// Bounded wait per persistence write, in seconds.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    /// Bounded wait for readers awaiting an in-flight write, in seconds.
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_secs: u64,
}

fn default_bank_path() -> PathBuf {
    PathBuf::from("questions.json")
}
fn default_duration_mins() -> u64 {
    60
}
fn default_write_timeout() -> u64 {
    10
}
fn default_settle_timeout() -> u64 {
    12
}

impl Default for ExamkitConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            bank_path: default_bank_path(),
            test_duration_mins: default_duration_mins(),
            write_timeout_secs: default_write_timeout(),
            settle_timeout_secs: default_settle_timeout(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a
/// string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::Rest { base_url, api_key } => StoreConfig::Rest {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
        },
        StoreConfig::Memory => StoreConfig::Memory,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examkit.toml` in the current directory
/// 2. `~/.config/examkit/config.toml`
///
/// Environment variable overrides: `EXAMKIT_BASE_URL`,
/// `EXAMKIT_API_KEY`.
pub fn load_config() -> Result<ExamkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamkitConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examkit.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExamkitConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamkitConfig::default(),
    };

    // Apply env var overrides
    if let Ok(base_url) = std::env::var("EXAMKIT_BASE_URL") {
        let api_key = match &config.store {
            StoreConfig::Rest { api_key, .. } => api_key.clone(),
            StoreConfig::Memory => None,
        };
        config.store = StoreConfig::Rest { base_url, api_key };
    }
    if let Ok(key) = std::env::var("EXAMKIT_API_KEY") {
        if let StoreConfig::Rest { api_key, .. } = &mut config.store {
            *api_key = Some(key);
        }
    }

    config.store = resolve_store_config(&config.store);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examkit"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn ResultStore> {
    match config {
        StoreConfig::Rest { base_url, api_key } => {
            Arc::new(RestStore::new(base_url, api_key.clone()))
        }
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
    }
}
