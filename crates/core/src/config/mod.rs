//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REELRATE_*)
//! 2. TOML config file (if REELRATE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::store::CacheLifetime;

mod skin;
mod validation;

pub use skin::SkinConfig;
pub use validation::ConfigError;

const ONE_DAY_MS: u64 = 86_400_000;
const ONE_WEEK_MS: u64 = 604_800_000;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REELRATE_*)
/// 2. TOML config file (if REELRATE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the rating site that gets scraped.
    ///
    /// Set via REELRATE_SITE_URL environment variable.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via REELRATE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via REELRATE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via REELRATE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Path to the SQLite file holding the persisted rating cache.
    ///
    /// Set via REELRATE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Name of the persisted record holding the serialized cache map.
    ///
    /// Set via REELRATE_STORAGE_KEY environment variable.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Lower bound of a cache entry's lifetime in milliseconds.
    ///
    /// Set via REELRATE_MIN_LIFETIME_MS environment variable.
    #[serde(default = "default_min_lifetime_ms")]
    pub min_lifetime_ms: u64,

    /// Upper bound (exclusive) of a cache entry's lifetime in milliseconds.
    ///
    /// Set via REELRATE_MAX_LIFETIME_MS environment variable.
    #[serde(default = "default_max_lifetime_ms")]
    pub max_lifetime_ms: u64,

    /// Selector of the element whose subtree is observed for inserted content.
    ///
    /// Set via REELRATE_OBSERVATION_ROOT environment variable.
    #[serde(default = "default_observation_root")]
    pub observation_root: String,

    /// Return an expired cached value when a fresh resolution fails.
    ///
    /// Set via REELRATE_SERVE_STALE_ON_ERROR environment variable.
    #[serde(default)]
    pub serve_stale_on_error: bool,

    /// Interval for detecting cache writes made by other processes, in milliseconds.
    ///
    /// Set via REELRATE_SYNC_POLL_MS environment variable.
    #[serde(default = "default_sync_poll_ms")]
    pub sync_poll_ms: u64,

    /// Host page selectors.
    #[serde(default)]
    pub skin: SkinConfig,
}

fn default_site_url() -> String {
    "https://www.imdb.com".into()
}

fn default_user_agent() -> String {
    "reelrate/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./reelrate-cache.sqlite")
}

fn default_storage_key() -> String {
    "netflix-cache".into()
}

fn default_min_lifetime_ms() -> u64 {
    ONE_DAY_MS
}

fn default_max_lifetime_ms() -> u64 {
    ONE_WEEK_MS
}

fn default_observation_root() -> String {
    "#appMountPoint".into()
}

fn default_sync_poll_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            db_path: default_db_path(),
            storage_key: default_storage_key(),
            min_lifetime_ms: default_min_lifetime_ms(),
            max_lifetime_ms: default_max_lifetime_ms(),
            observation_root: default_observation_root(),
            serve_stale_on_error: false,
            sync_poll_ms: default_sync_poll_ms(),
            skin: SkinConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval for cross-process cache change detection.
    pub fn sync_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync_poll_ms)
    }

    /// Cache entry lifetime bounds.
    pub fn lifetime(&self) -> CacheLifetime {
        CacheLifetime::new(
            Duration::from_millis(self.min_lifetime_ms),
            Duration::from_millis(self.max_lifetime_ms),
        )
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REELRATE_`
    /// 2. TOML file from `REELRATE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("REELRATE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REELRATE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
