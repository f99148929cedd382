//! Configuration loading for remotedoc.
//!
//! Layering (highest to lowest precedence), following the same pattern as
//! the 12-factor `config` crate wiring used across this lineage:
//! 1. Environment variables (`REMOTEDOC_*`, plus `PORT`/`HOST` for
//!    conventional overrides)
//! 2. `config/default.toml` and `config/{RUN_MODE}.toml`
//! 3. Hardcoded defaults

use config::{Config, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error(
        "sync_interval_secs and webhook_enabled are mutually exclusive; enabling the webhook requires sync_interval to be unset"
    )]
    MutuallyExclusiveSync,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositorySeed {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    #[serde(default = "default_root_spec_path")]
    pub root_spec_path: String,
    /// Name of an environment variable holding the upstream credential, if any.
    pub credential_env: Option<String>,
}

fn default_root_spec_path() -> String {
    "spec.md".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cache_root: PathBuf,
    pub sync_interval_secs: Option<u64>,
    #[serde(default)]
    pub webhook_enabled: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default)]
    pub repositories: Vec<RepositorySeed>,
    /// Plaintext operator API keys, each granted access to every
    /// configured repository. Stands in for the admin-CRUD-backed key
    /// binding store (§1) in a config-file-only deployment; empty means
    /// no keys are pre-provisioned.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_max_workers() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            cache_root: default_cache_root(),
            sync_interval_secs: Some(600),
            webhook_enabled: false,
            max_workers: default_max_workers(),
            repositories: Vec::new(),
            api_keys: Vec::new(),
        }
    }
}

fn default_cache_root() -> PathBuf {
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".github_cache")
}

impl AppConfig {
    /// Loads configuration with env-var overrides layered over optional
    /// `config/default.toml` / `config/{RUN_MODE}.toml` files.
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8765)?
            .set_default(
                "cache_root",
                default_cache_root().to_string_lossy().into_owned(),
            )?
            .set_default("sync_interval_secs", 600)?
            .set_default("webhook_enabled", false)?
            .set_default("max_workers", 5)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        if let Ok(port) = env::var("PORT") {
            if let Ok(p) = port.parse::<i64>() {
                builder = builder.set_override("port", p)?;
            }
        }
        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("host", host)?;
        }
        if let Ok(root) = env::var("REMOTEDOC_CACHE_ROOT") {
            builder = builder.set_override("cache_root", root)?;
        }
        if let Ok(interval) = env::var("REMOTEDOC_SYNC_INTERVAL_SECS") {
            if let Ok(v) = interval.parse::<i64>() {
                builder = builder.set_override("sync_interval_secs", v)?;
            }
        }
        if let Ok(enabled) = env::var("REMOTEDOC_WEBHOOK_ENABLED") {
            builder = builder.set_override(
                "webhook_enabled",
                matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes"),
            )?;
        }
        if let Ok(workers) = env::var("REMOTEDOC_MAX_WORKERS") {
            if let Ok(v) = workers.parse::<i64>() {
                builder = builder.set_override("max_workers", v)?;
            }
        }
        if let Ok(keys) = env::var("REMOTEDOC_API_KEYS") {
            let keys: Vec<String> = keys.split(',').map(str::trim).filter(|k| !k.is_empty()).map(str::to_string).collect();
            builder = builder.set_override("api_keys", keys)?;
        }

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        validate(&cfg)?;
        Ok(cfg)
    }
}

fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.webhook_enabled && cfg.sync_interval_secs.is_some() {
        return Err(ConfigError::MutuallyExclusiveSync);
    }
    Ok(())
}
