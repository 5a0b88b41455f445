pub mod core;
pub mod observability;
pub mod vapi;

pub use observability::ClientMetrics;
pub use vapi::VapiTransport;
