//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (UMBRA_*)
//! 2. TOML config file (if UMBRA_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (UMBRA_*)
/// 2. TOML config file (if UMBRA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Name of the current cache generation.
    ///
    /// Changing this tag deploys a new generation; every generation with
    /// a different name is deleted at the next activation.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Ordered list of assets to populate at install time.
    ///
    /// Entries are either absolute URLs or paths resolved against
    /// `origin`.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Base URL that relative manifest entries and relative fetch
    /// requests are resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite cache store.
    ///
    /// Set via UMBRA_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_name() -> String {
    "analyzer-v1".into()
}

fn default_precache_manifest() -> Vec<String> {
    vec![
        "app.html".into(),
        "manifest.json".into(),
        "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js".into(),
        "https://cdn.jsdelivr.net/npm/jszip@3.10.1/dist/jszip.min.js".into(),
    ]
}

fn default_origin() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./umbra-cache.sqlite")
}

fn default_user_agent() -> String {
    "umbra/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            precache_manifest: default_precache_manifest(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `UMBRA_`
    /// 2. TOML file from `UMBRA_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("UMBRA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("UMBRA_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
