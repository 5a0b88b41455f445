//! Retry and batching configuration parsing from environment variables.

use super::parse_bool;
use super::vapi_config::parse_u64;
use crate::infrastructure::core::retry::MAX_RETRIES;
use anyhow::{Context, Result};
use std::env;

/// Retry and batch-queue environment configuration
#[derive(Debug, Clone)]
pub struct DispatchEnvConfig {
    // Retry
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_non_idempotent: bool,

    // Batching
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for DispatchEnvConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retry_base_delay_ms: 1000,
            retry_non_idempotent: false,
            batch_size: 5,
            batch_delay_ms: 100,
        }
    }
}

impl DispatchEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let batch_size = env::var("VAPI_BATCH_SIZE")
            .unwrap_or_else(|_| defaults.batch_size.to_string())
            .parse::<usize>()
            .context("Failed to parse VAPI_BATCH_SIZE")?;
        if batch_size == 0 {
            anyhow::bail!("VAPI_BATCH_SIZE must be at least 1");
        }

        let max_retries = env::var("VAPI_MAX_RETRIES")
            .unwrap_or_else(|_| defaults.max_retries.to_string())
            .parse::<u32>()
            .context("Failed to parse VAPI_MAX_RETRIES")?;
        if max_retries > MAX_RETRIES {
            anyhow::bail!("VAPI_MAX_RETRIES must be at most {}", MAX_RETRIES);
        }

        Ok(Self {
            max_retries,
            retry_base_delay_ms: parse_u64("VAPI_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms)?,
            retry_non_idempotent: parse_bool("VAPI_RETRY_NON_IDEMPOTENT", defaults.retry_non_idempotent)?,
            batch_size,
            batch_delay_ms: parse_u64("VAPI_BATCH_DELAY_MS", defaults.batch_delay_ms)?,
        })
    }
}
