//! VAPI connection configuration parsing from environment variables.
//!
//! Covers credentials, endpoint and the transport limits applied to every request.

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_POOL_MAX_IDLE: usize = 10;

/// VAPI API configuration
#[derive(Debug, Clone)]
pub struct VapiEnvConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_response_bytes: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for VapiEnvConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE,
        }
    }
}

impl VapiEnvConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("VAPI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url).context(format!("Invalid VAPI_BASE_URL: {}", base_url))?;

        Ok(Self {
            api_key: env::var("VAPI_API_KEY").unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms: parse_u64("VAPI_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            connect_timeout_ms: parse_u64("VAPI_CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT_MS)?,
            max_response_bytes: parse_u64("VAPI_MAX_RESPONSE_BYTES", DEFAULT_MAX_RESPONSE_BYTES)?,
            pool_max_idle_per_host: env::var("VAPI_POOL_MAX_IDLE")
                .unwrap_or_else(|_| DEFAULT_POOL_MAX_IDLE.to_string())
                .parse::<usize>()
                .context("Failed to parse VAPI_POOL_MAX_IDLE")?,
        })
    }
}

pub(crate) fn parse_u64(key: &str, default: u64) -> Result<u64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .context(format!("Failed to parse {}", key))
}
