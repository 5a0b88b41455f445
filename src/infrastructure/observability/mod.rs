//! Push-based observability for the VAPI client
//!
//! Metrics are collected in-process and rendered on demand in Prometheus text
//! format; nothing here listens for incoming requests.

pub mod metrics;

pub use metrics::ClientMetrics;
