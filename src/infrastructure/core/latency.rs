use crate::infrastructure::core::retry::AttemptContext;
use crate::infrastructure::observability::ClientMetrics;
use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::time::Instant;
use tracing::{debug, warn};

/// Logs status and elapsed time for every attempt that goes over the wire.
pub struct LatencyLoggingMiddleware {
    metrics: Option<ClientMetrics>,
}

impl LatencyLoggingMiddleware {
    pub fn new(metrics: Option<ClientMetrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Middleware for LatencyLoggingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let path = req.url().path().to_string();
        let attempt = extensions
            .get::<AttemptContext>()
            .map(|ctx| ctx.attempt)
            .unwrap_or(1);

        debug!(%method, path = %path, attempt, "Sending VAPI request");
        let start = Instant::now();
        let outcome = next.run(req, extensions).await;
        let elapsed = start.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let status_label = match &outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(%method, path = %path, status = status.as_u16(), elapsed_ms, attempt, "VAPI response");
                } else {
                    warn!(%method, path = %path, status = status.as_u16(), elapsed_ms, attempt, "VAPI error response");
                }
                status.as_str().to_string()
            }
            Err(err) => {
                warn!(%method, path = %path, elapsed_ms, attempt, error = %err, "VAPI request failed");
                "error".to_string()
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_attempt(method.as_str(), &status_label, elapsed.as_secs_f64());
        }

        outcome
    }
}
