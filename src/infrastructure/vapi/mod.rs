pub mod transport;

pub use transport::VapiTransport;
