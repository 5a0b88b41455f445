use crate::domain::request::is_idempotent_method;
use crate::infrastructure::observability::ClientMetrics;
use async_trait::async_trait;
use http::Extensions;
use reqwest::{Method, Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{Jitter, RetryDecision, RetryPolicy, Retryable, RetryableStrategy};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Upper bound on retries after the initial attempt.
pub const MAX_RETRIES: u32 = 3;

/// Retry policy for transient failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Retries after the initial attempt, at most [`MAX_RETRIES`].
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each following one.
    pub base_delay: Duration,
    /// Also retry POST/PATCH on 5xx and timeouts, where the server may already have acted.
    pub retry_non_idempotent: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(1000),
            retry_non_idempotent: false,
        }
    }
}

impl RetrySettings {
    /// Unjittered `2^k * base_delay` backoff, capped at [`MAX_RETRIES`].
    pub fn policy(&self) -> ExponentialBackoff {
        let max_retries = self.max_retries.min(MAX_RETRIES);
        let longest = self
            .base_delay
            .saturating_mul(1u32 << max_retries.saturating_sub(1));
        ExponentialBackoff::builder()
            .retry_bounds(self.base_delay, longest)
            .jitter(Jitter::None)
            .base(2)
            .build_with_max_retries(max_retries)
    }
}

/// 1-based number of the attempt currently travelling through the middleware chain.
///
/// Once the chain returns, it holds the total number of attempts made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    RateLimited,
    ServerError,
    Network,
}

impl RetryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryReason::RateLimited => "rate_limited",
            RetryReason::ServerError => "server_error",
            RetryReason::Network => "network",
        }
    }

    fn of(outcome: &reqwest_middleware::Result<Response>) -> Self {
        match outcome {
            Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                RetryReason::RateLimited
            }
            Ok(_) => RetryReason::ServerError,
            Err(_) => RetryReason::Network,
        }
    }
}

/// 429 and 5xx are transient, other error statuses are fatal, and any failure that
/// produced no response at all is treated as a transient network failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientStatusStrategy;

impl RetryableStrategy for TransientStatusStrategy {
    fn handle(&self, res: &reqwest_middleware::Result<Response>) -> Option<Retryable> {
        match res {
            Ok(response) => classify_status(response.status()),
            Err(reqwest_middleware::Error::Reqwest(err)) => Some(classify_reqwest_error(err)),
            Err(_) => Some(Retryable::Fatal),
        }
    }
}

pub fn classify_status(status: StatusCode) -> Option<Retryable> {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(Retryable::Transient)
    } else if status.is_client_error() {
        Some(Retryable::Fatal)
    } else {
        None
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> Retryable {
    if err.is_builder() || err.is_redirect() {
        Retryable::Fatal
    } else {
        Retryable::Transient
    }
}

/// Re-sends transient failures with exponential backoff.
///
/// Sits outermost in the middleware chain so every retry passes through the
/// inner layers (latency logging) as a fresh attempt.
pub struct RetryMiddleware {
    settings: RetrySettings,
    policy: ExponentialBackoff,
    strategy: TransientStatusStrategy,
    metrics: Option<ClientMetrics>,
}

impl RetryMiddleware {
    pub fn new(settings: RetrySettings, metrics: Option<ClientMetrics>) -> Self {
        Self {
            policy: settings.policy(),
            settings,
            strategy: TransientStatusStrategy,
            metrics,
        }
    }

    /// POST/PATCH are only repeated when the first try provably never reached the
    /// server (connect failure) or was explicitly refused (429).
    fn permits_retry(&self, method: &Method, outcome: &reqwest_middleware::Result<Response>) -> bool {
        if self.settings.retry_non_idempotent || is_idempotent_method(method) {
            return true;
        }
        match outcome {
            Ok(response) => response.status() == StatusCode::TOO_MANY_REQUESTS,
            Err(reqwest_middleware::Error::Reqwest(err)) => err.is_connect(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let mut current = req;
        let mut attempt: u32 = 0;
        let started = SystemTime::now();

        loop {
            attempt += 1;
            extensions.insert(AttemptContext { attempt });

            // Streaming bodies cannot be replayed; such requests get a single attempt.
            let duplicate = current.try_clone();
            let outcome = next.clone().run(current, extensions).await;

            let Some(retry_request) = duplicate else {
                return outcome;
            };

            let retries_done = attempt - 1;
            if !matches!(self.strategy.handle(&outcome), Some(Retryable::Transient)) {
                return outcome;
            }

            let execute_after = match self.policy.should_retry(started, retries_done) {
                RetryDecision::Retry { execute_after } => execute_after,
                RetryDecision::DoNotRetry => {
                    debug!(
                        method = %retry_request.method(),
                        path = %retry_request.url().path(),
                        attempts = attempt,
                        "Retries exhausted"
                    );
                    return outcome;
                }
            };

            if !self.permits_retry(retry_request.method(), &outcome) {
                warn!(
                    method = %retry_request.method(),
                    path = %retry_request.url().path(),
                    "Not retrying non-idempotent request after ambiguous failure"
                );
                return outcome;
            }

            let reason = RetryReason::of(&outcome);
            let delay = execute_after
                .duration_since(SystemTime::now())
                .unwrap_or_default();
            warn!(
                method = %retry_request.method(),
                path = %retry_request.url().path(),
                attempt,
                reason = reason.as_str(),
                delay_ms = delay.as_millis() as u64,
                "Retrying VAPI request"
            );
            if let Some(metrics) = &self.metrics {
                metrics.inc_retries(reason.as_str());
            }

            drop(outcome);
            tokio::time::sleep(delay).await;
            current = retry_request;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_before(policy: &ExponentialBackoff, retries_done: u32) -> Option<Duration> {
        match policy.should_retry(SystemTime::now(), retries_done) {
            RetryDecision::Retry { execute_after } => Some(
                execute_after
                    .duration_since(SystemTime::now())
                    .unwrap_or_default(),
            ),
            RetryDecision::DoNotRetry => None,
        }
    }

    fn assert_close(actual: Option<Duration>, expected_ms: u64) {
        let actual = actual.expect("retry expected");
        let expected = Duration::from_millis(expected_ms);
        assert!(actual <= expected, "{:?} > {:?}", actual, expected);
        assert!(
            actual + Duration::from_millis(50) >= expected,
            "{:?} too far below {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetrySettings::default().policy();
        assert_eq!(policy.max_n_retries, Some(3));
        assert_close(wait_before(&policy, 0), 1000);
        assert_close(wait_before(&policy, 1), 2000);
        assert_close(wait_before(&policy, 2), 4000);
        assert!(wait_before(&policy, 3).is_none());
    }

    #[test]
    fn test_policy_caps_retries_at_three() {
        let policy = RetrySettings {
            max_retries: 10,
            base_delay: Duration::from_millis(10),
            ..RetrySettings::default()
        }
        .policy();
        assert_eq!(policy.max_n_retries, Some(MAX_RETRIES));
        assert_close(wait_before(&policy, 2), 40);
        assert!(wait_before(&policy, 3).is_none());
    }

    #[test]
    fn test_zero_retries_never_retries() {
        let policy = RetrySettings {
            max_retries: 0,
            ..RetrySettings::default()
        }
        .policy();
        assert!(wait_before(&policy, 0).is_none());
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(Retryable::Transient)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(Retryable::Transient)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(Retryable::Transient)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            Some(Retryable::Fatal)
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT),
            Some(Retryable::Fatal)
        ));
    }

    #[test]
    fn test_idempotent_methods_always_permitted() {
        let middleware = RetryMiddleware::new(RetrySettings::default(), None);
        let outcome: reqwest_middleware::Result<Response> = Err(
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("boom")),
        );
        assert!(middleware.permits_retry(&Method::GET, &outcome));
        assert!(!middleware.permits_retry(&Method::POST, &outcome));

        let lenient = RetryMiddleware::new(
            RetrySettings {
                retry_non_idempotent: true,
                ..RetrySettings::default()
            },
            None,
        );
        assert!(lenient.permits_retry(&Method::POST, &outcome));
    }
}
