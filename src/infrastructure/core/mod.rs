pub mod body;
pub mod http_client_factory;
pub mod latency;
pub mod retry;

pub use body::BufferedBodyMiddleware;
pub use http_client_factory::HttpClientFactory;
pub use latency::LatencyLoggingMiddleware;
pub use retry::{RetryMiddleware, RetrySettings};
