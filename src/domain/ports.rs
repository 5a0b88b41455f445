use crate::domain::errors::ApiError;
use crate::domain::request::ApiRequest;
use async_trait::async_trait;
use serde_json::Value;

/// Performs one outbound call, including whatever retrying the implementation does.
///
/// The batch processor and the service façade only talk to this trait, so tests can
/// swap the HTTP transport for a scripted stub.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError>;
}
