// Domain-specific error types
pub mod errors;

// Port interfaces
pub mod ports;

// Fan-out and health reporting types
pub mod reports;

// Outbound request descriptors
pub mod request;

// VAPI resource collections
pub mod resource;
