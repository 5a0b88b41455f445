use crate::application::batch_processor::{BatchHandle, BatchProcessor, BatchSettings};
use crate::config::ClientConfig;
use crate::domain::errors::ApiError;
use crate::domain::ports::RequestExecutor;
use crate::domain::reports::{FetchOutcome, HealthReport, HealthStatus};
use crate::domain::request::ApiRequest;
use crate::domain::resource::{ListParams, ResourceKind};
use crate::infrastructure::observability::ClientMetrics;
use crate::infrastructure::vapi::VapiTransport;
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Page size used for each kind in a fan-out fetch.
pub const DEFAULT_FAN_OUT_LIMIT: u32 = 100;

/// Typed operations over the VAPI API.
///
/// Reads go straight to the transport; writes that arrive in bursts (outbound
/// calls) go through the batch queue.
pub struct VapiService {
    executor: Arc<dyn RequestExecutor>,
    batch: BatchProcessor,
}

impl VapiService {
    pub fn new(config: &ClientConfig, metrics: Option<ClientMetrics>) -> Result<Self, ApiError> {
        let transport: Arc<dyn RequestExecutor> =
            Arc::new(VapiTransport::new(config, metrics.clone())?);
        Ok(Self::with_executor(transport, config.batch.clone(), metrics))
    }

    pub fn with_executor(
        executor: Arc<dyn RequestExecutor>,
        settings: BatchSettings,
        metrics: Option<ClientMetrics>,
    ) -> Self {
        let batch = BatchProcessor::new(executor.clone(), settings, metrics);
        Self { executor, batch }
    }

    pub fn batch_processor(&self) -> &BatchProcessor {
        &self.batch
    }

    pub async fn list_resource(&self, kind: ResourceKind, limit: u32) -> Result<Value, ApiError> {
        self.list_resource_page(kind, ListParams::limit(limit)).await
    }

    pub async fn list_resource_page(
        &self,
        kind: ResourceKind,
        params: ListParams,
    ) -> Result<Value, ApiError> {
        self.executor.execute(params.to_request(kind)).await
    }

    pub async fn get_resource(&self, kind: ResourceKind, id: &str) -> Result<Value, ApiError> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(ApiError::InvalidRequest {
                message: format!("invalid {} id: {:?}", kind, id),
            });
        }
        self.executor
            .execute(ApiRequest::get(format!("{}/{}", kind.path(), id)))
            .await
    }

    /// Places an outbound call through the batch queue.
    pub fn create_call(&self, payload: Value) -> BatchHandle {
        self.enqueue(ApiRequest::post(ResourceKind::Calls.path(), payload))
    }

    pub fn enqueue(&self, request: ApiRequest) -> BatchHandle {
        self.batch.submit(request)
    }

    /// Lists every requested kind concurrently. Never fails as a whole: each key
    /// carries its own success or failure, unknown kinds included. Repeated kinds
    /// are fetched once.
    pub async fn fan_out_fetch<S: AsRef<str>>(&self, kinds: &[S]) -> BTreeMap<String, FetchOutcome> {
        let mut unique = HashSet::new();
        let keys: Vec<&str> = kinds
            .iter()
            .map(|raw| raw.as_ref())
            .filter(|key| unique.insert(*key))
            .collect();

        let fetches = keys.into_iter().map(|raw| {
            let key = raw.to_string();
            async move {
                let outcome = match key.parse::<ResourceKind>() {
                    Ok(kind) => match self.list_resource(kind, DEFAULT_FAN_OUT_LIMIT).await {
                        Ok(data) => FetchOutcome::success(data),
                        Err(e) => {
                            warn!("Fan-out fetch of {} failed: {}", kind, e);
                            FetchOutcome::failure(e.to_string())
                        }
                    },
                    Err(e) => FetchOutcome::failure(e.to_string()),
                };
                (key, outcome)
            }
        });

        let results: BTreeMap<String, FetchOutcome> = join_all(fetches).await.into_iter().collect();
        let failed = results.values().filter(|outcome| !outcome.success).count();
        info!(
            "Fan-out fetch finished: {} kinds, {} failed",
            results.len(),
            failed
        );
        results
    }

    /// Checks the API with the cheapest possible list request.
    pub async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let result = self.list_resource(ResourceKind::Assistants, 1).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthReport {
                status: HealthStatus::Healthy,
                response_time_ms,
                status_code: 200,
                error: None,
                checked_at: Utc::now(),
            },
            Err(e) => {
                warn!("VAPI health check failed after {}ms: {}", response_time_ms, e);
                HealthReport {
                    status: HealthStatus::Unhealthy,
                    response_time_ms,
                    status_code: e.status_code(),
                    error: Some(e.to_string()),
                    checked_at: Utc::now(),
                }
            }
        }
    }
}
