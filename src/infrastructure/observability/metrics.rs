//! Prometheus metrics for the VAPI client
//!
//! All metrics use the `vapi_` prefix and live in a registry owned by the
//! [`ClientMetrics`] instance, so independent clients never share counters.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ClientMetrics {
    registry: Arc<Registry>,
    /// Completed attempts by method and status ("error" when no response)
    pub requests_total: CounterVec,
    /// Retries scheduled by reason (rate_limited, server_error, network)
    pub retries_total: CounterVec,
    /// Per-attempt latency in seconds
    pub request_latency_seconds: HistogramVec,
    /// Drained batch rounds
    pub batch_rounds_total: IntCounter,
    /// Entries per drained batch
    pub batch_size: Histogram,
    /// Entries waiting in the batch queue
    pub queue_depth: Gauge,
}

impl ClientMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("vapi_requests_total", "Total API attempts by method and status"),
            &["method", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let retries_total = CounterVec::new(
            Opts::new("vapi_retries_total", "Total retries scheduled by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(retries_total.clone()))?;

        let request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "vapi_request_latency_seconds",
                "API attempt latency in seconds",
            )
            .buckets(vec![
                0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["method"],
        )?;
        registry.register(Box::new(request_latency_seconds.clone()))?;

        let batch_rounds_total = IntCounter::new(
            "vapi_batch_rounds_total",
            "Total batch rounds drained from the queue",
        )?;
        registry.register(Box::new(batch_rounds_total.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("vapi_batch_size", "Entries dispatched per batch round")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        let queue_depth = Gauge::with_opts(Opts::new(
            "vapi_queue_depth",
            "Entries waiting in the batch queue",
        ))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            retries_total,
            request_latency_seconds,
            batch_rounds_total,
            batch_size,
            queue_depth,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn observe_attempt(&self, method: &str, status: &str, latency_secs: f64) {
        self.requests_total
            .with_label_values(&[method, status])
            .inc();
        self.request_latency_seconds
            .with_label_values(&[method])
            .observe(latency_secs);
    }

    pub fn inc_retries(&self, reason: &str) {
        self.retries_total.with_label_values(&[reason]).inc();
    }

    pub fn observe_batch(&self, size: usize) {
        self.batch_rounds_total.inc();
        self.batch_size.observe(size as f64);
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ClientMetrics::new().expect("Failed to create metrics");
        assert!(metrics.render().contains("vapi_"));
    }

    #[test]
    fn test_attempt_counter_by_status() {
        let metrics = ClientMetrics::new().expect("Failed to create metrics");
        metrics.observe_attempt("GET", "200", 0.05);
        metrics.observe_attempt("GET", "503", 0.01);
        let output = metrics.render();
        assert!(output.contains("vapi_requests_total"));
        assert!(output.contains("status=\"503\""));
        assert!(output.contains("vapi_request_latency_seconds"));
    }

    #[test]
    fn test_batch_rounds() {
        let metrics = ClientMetrics::new().expect("Failed to create metrics");
        metrics.observe_batch(5);
        metrics.observe_batch(2);
        metrics.set_queue_depth(3);
        assert_eq!(metrics.batch_rounds_total.get(), 2);
        assert_eq!(metrics.batch_size.get_sample_count(), 2);
        assert!(metrics.render().contains("vapi_queue_depth 3"));
    }

    #[test]
    fn test_independent_registries() {
        let a = ClientMetrics::new().unwrap();
        let b = ClientMetrics::new().unwrap();
        a.inc_retries("network");
        assert!(a.render().contains("vapi_retries_total"));
        assert!(!b.render().contains("reason=\"network\""));
    }
}
