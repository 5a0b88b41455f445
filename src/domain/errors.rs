use thiserror::Error;

/// Errors surfaced by the VAPI client, the batch processor and the façade.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 4xx other than 429. Never retried.
    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    /// 429 or 5xx that kept failing after every retry was spent.
    #[error("Transient failure {status} after {attempts} attempts: {message}")]
    TransientFailure {
        status: u16,
        message: String,
        attempts: u32,
    },

    /// No response was received (timeout, DNS, connection refused).
    #[error("Network error after {attempts} attempts: {message}")]
    Network { message: String, attempts: u32 },

    /// The batch round failed before the entry's own request could settle it.
    #[error("Batch dispatch failed: {message}")]
    BatchDispatch { message: String },

    #[error("Unknown resource kind: {kind}")]
    UnknownResource { kind: String },

    /// Rejected locally before anything was sent.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Response too large: {actual} bytes exceeds limit of {limit} bytes")]
    ResponseTooLarge { limit: u64, actual: u64 },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Invalid client configuration: {message}")]
    Configuration { message: String },
}

impl ApiError {
    /// HTTP status observed for this failure, or 0 when no response was received.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Client { status, .. } | ApiError::TransientFailure { status, .. } => *status,
            _ => 0,
        }
    }

    /// Attempts made before giving up, when the failure went through the retry layer.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ApiError::TransientFailure { attempts, .. } | ApiError::Network { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    /// True for 429/5xx and network failures.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::TransientFailure { .. } | ApiError::Network { .. }
        )
    }
}
