//! Configuration module for vapi-bridge.
//!
//! Configuration is loaded from environment variables and organized by concern:
//! VAPI connection, retry/batch dispatch, and observability. Library components
//! consume the typed [`ClientConfig`], which never touches the environment.

mod dispatch_config;
mod vapi_config;

pub use dispatch_config::DispatchEnvConfig;
pub use vapi_config::{DEFAULT_BASE_URL, VapiEnvConfig};

use crate::application::batch_processor::BatchSettings;
use crate::infrastructure::core::retry::RetrySettings;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Typed settings for the HTTP transport, retry layer and batch processor.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_response_bytes: u64,
    pub pool_max_idle_per_host: usize,
    pub retry: RetrySettings,
    pub batch: BatchSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_parts(
            &VapiEnvConfig::default(),
            &DispatchEnvConfig::default(),
        )
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    fn from_parts(vapi: &VapiEnvConfig, dispatch: &DispatchEnvConfig) -> Self {
        Self {
            base_url: vapi.base_url.clone(),
            api_key: vapi.api_key.clone(),
            timeout: Duration::from_millis(vapi.timeout_ms),
            connect_timeout: Duration::from_millis(vapi.connect_timeout_ms),
            max_response_bytes: vapi.max_response_bytes,
            pool_max_idle_per_host: vapi.pool_max_idle_per_host,
            retry: RetrySettings {
                max_retries: dispatch.max_retries,
                base_delay: Duration::from_millis(dispatch.retry_base_delay_ms),
                retry_non_idempotent: dispatch.retry_non_idempotent,
            },
            batch: BatchSettings {
                batch_size: dispatch.batch_size,
                batch_delay: Duration::from_millis(dispatch.batch_delay_ms),
            },
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub vapi: VapiEnvConfig,
    pub dispatch: DispatchEnvConfig,
    pub observability_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let vapi = VapiEnvConfig::from_env().context("Failed to load VAPI config")?;
        let dispatch = DispatchEnvConfig::from_env().context("Failed to load dispatch config")?;

        Ok(Self {
            vapi,
            dispatch,
            observability_enabled: parse_bool("OBSERVABILITY_ENABLED", true)?,
        })
    }

    /// Fail early when the binary has no credentials to send.
    pub fn require_api_key(&self) -> Result<()> {
        if self.vapi.api_key.trim().is_empty() {
            anyhow::bail!("VAPI_API_KEY is not set");
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::from_parts(&self.vapi, &self.dispatch)
    }
}

/// Reads a `true`/`false` variable, falling back to `default` when unset.
pub(crate) fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<bool>()
            .with_context(|| format!("Failed to parse {}", key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults_match_dispatch_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(1000));
        assert!(!config.retry.retry_non_idempotent);
        assert_eq!(config.batch.batch_size, 5);
        assert_eq!(config.batch.batch_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_client_config_new_strips_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8080/", "secret");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.batch.batch_size, 5);
    }
}
