// Rate-limit-friendly request queue
pub mod batch_processor;

// Typed VAPI operations
pub mod vapi_service;

pub use batch_processor::{BatchHandle, BatchProcessor, BatchSettings};
pub use vapi_service::VapiService;
