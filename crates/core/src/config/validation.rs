//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

const MAX_LIFETIME_MS: u64 = 365 * 86_400_000;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `storage_key` is empty
    /// - `site_url` is not an absolute http(s) URL
    /// - `min_lifetime_ms` is 0 or not below `max_lifetime_ms`
    /// - `max_lifetime_ms` exceeds one year
    /// - a `skin` selector is blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid { field: "storage_key".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.site_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "site_url".into(),
                    reason: format!("unsupported scheme: {}", url.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "site_url".into(), reason: e.to_string() }),
        }

        if self.min_lifetime_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "min_lifetime_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.max_lifetime_ms > MAX_LIFETIME_MS {
            return Err(ConfigError::Invalid {
                field: "max_lifetime_ms".into(),
                reason: format!("must not exceed one year ({MAX_LIFETIME_MS}ms)"),
            });
        }
        if self.min_lifetime_ms >= self.max_lifetime_ms {
            return Err(ConfigError::Invalid {
                field: "max_lifetime_ms".into(),
                reason: "must be greater than min_lifetime_ms".into(),
            });
        }

        if let Some((name, _)) = self.skin.entries().into_iter().find(|(_, selector)| selector.trim().is_empty()) {
            return Err(ConfigError::Invalid { field: format!("skin.{name}"), reason: "must not be empty".into() });
        }

        if self.sync_poll_ms < 50 {
            tracing::warn!(sync_poll_ms = self.sync_poll_ms, "Very short sync_poll_ms; expect frequent database polling");
        }

        Ok(())
    }
}
