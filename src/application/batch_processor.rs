use crate::domain::errors::ApiError;
use crate::domain::ports::RequestExecutor;
use crate::domain::request::ApiRequest;
use crate::infrastructure::observability::ClientMetrics;
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

pub type BatchResult = Result<Value, ApiError>;

/// Group size and spacing used when draining the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub batch_size: usize,
    /// Pause between rounds while entries remain queued.
    pub batch_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_millis(100),
        }
    }
}

struct QueueEntry {
    request: ApiRequest,
    responder: oneshot::Sender<BatchResult>,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<QueueEntry>,
    processing: bool,
}

struct Shared {
    executor: Arc<dyn RequestExecutor>,
    settings: BatchSettings,
    metrics: Option<ClientMetrics>,
    // Queue and drain flag share one lock so "push + check flag" and
    // "observe empty + clear flag" cannot interleave. Never held across an await.
    state: Mutex<QueueState>,
}

/// Smooths bursts of requests into fixed-size rounds against the upstream rate limit.
///
/// At most one drain loop runs per processor. Every submitted entry is settled
/// exactly once through its [`BatchHandle`].
#[derive(Clone)]
pub struct BatchProcessor {
    inner: Arc<Shared>,
}

impl BatchProcessor {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        settings: BatchSettings,
        metrics: Option<ClientMetrics>,
    ) -> Self {
        let settings = BatchSettings {
            batch_size: settings.batch_size.max(1),
            ..settings
        };
        Self {
            inner: Arc::new(Shared {
                executor,
                settings,
                metrics,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.inner.settings
    }

    /// Queues `request` and returns immediately; starts a drain loop if none is active.
    pub fn submit(&self, request: ApiRequest) -> BatchHandle {
        let (responder, receiver) = oneshot::channel();

        let start_drain = {
            let mut state = self.inner.lock_state();
            state.entries.push_back(QueueEntry { request, responder });
            self.inner.report_depth(state.entries.len());
            if state.processing {
                false
            } else {
                state.processing = true;
                true
            }
        };

        if start_drain {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(self.inner.clone().drain());
                }
                Err(_) => self.inner.reject_all("no async runtime available to drain the queue"),
            }
        }

        BatchHandle { receiver }
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock_state().entries.len()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock_state().processing
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_depth(&self, depth: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.set_queue_depth(depth);
        }
    }

    async fn drain(self: Arc<Self>) {
        let mut round: u64 = 0;
        loop {
            let batch: Vec<QueueEntry> = {
                let mut state = self.lock_state();
                if state.entries.is_empty() {
                    state.processing = false;
                    self.report_depth(0);
                    debug!(rounds = round, "Batch queue drained");
                    return;
                }
                let take = self.settings.batch_size.min(state.entries.len());
                let batch = state.entries.drain(..take).collect();
                self.report_depth(state.entries.len());
                batch
            };

            round += 1;
            self.dispatch_round(round, batch).await;

            let remaining = self.lock_state().entries.len();
            if remaining > 0 {
                debug!(
                    round,
                    remaining,
                    delay_ms = self.settings.batch_delay.as_millis() as u64,
                    "Waiting before next batch"
                );
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }
    }

    /// Dispatches one round concurrently and settles each entry as its own result arrives.
    ///
    /// A panic inside one request only fails that entry. The round-level guard
    /// covers the dispatch step itself, rejecting whatever is still unsettled.
    async fn dispatch_round(&self, round: u64, batch: Vec<QueueEntry>) {
        let size = batch.len();
        info!("BatchProcessor: Dispatching round {} ({} requests)", round, size);
        if let Some(metrics) = &self.metrics {
            metrics.observe_batch(size);
        }

        let mut responders = Vec::with_capacity(size);
        let mut requests = Vec::with_capacity(size);
        for entry in batch {
            responders.push(Some(entry.responder));
            requests.push(entry.request);
        }

        let executor = self.executor.clone();
        let outcome = AssertUnwindSafe(async {
            let mut in_flight: FuturesUnordered<_> = requests
                .into_iter()
                .enumerate()
                .map(|(index, request)| {
                    let executor = executor.clone();
                    async move {
                        let result = AssertUnwindSafe(executor.execute(request))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| {
                                let message = panic_message(panic.as_ref());
                                error!(
                                    "BatchProcessor: Request {} of round {} panicked: {}",
                                    index, round, message
                                );
                                Err(ApiError::BatchDispatch { message })
                            });
                        (index, result)
                    }
                })
                .collect();

            while let Some((index, result)) = in_flight.next().await {
                if let Some(responder) = responders[index].take() {
                    settle(responder, result);
                }
            }
        })
        .catch_unwind()
        .await;

        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            error!("BatchProcessor: Round {} dispatch failed: {}", round, message);
            for responder in responders.iter_mut().filter_map(Option::take) {
                settle(
                    responder,
                    Err(ApiError::BatchDispatch {
                        message: message.clone(),
                    }),
                );
            }
        }
    }

    fn reject_all(&self, reason: &str) {
        let drained: Vec<QueueEntry> = {
            let mut state = self.lock_state();
            state.processing = false;
            self.report_depth(0);
            state.entries.drain(..).collect()
        };
        error!("BatchProcessor: Rejecting {} queued requests: {}", drained.len(), reason);
        for entry in drained {
            settle(
                entry.responder,
                Err(ApiError::BatchDispatch {
                    message: reason.to_string(),
                }),
            );
        }
    }
}

fn settle(responder: oneshot::Sender<BatchResult>, result: BatchResult) {
    if responder.send(result).is_err() {
        warn!("BatchProcessor: Caller dropped its handle before the result arrived");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "batch dispatch panicked".to_string()
    }
}

/// Completion handle for a submitted request.
///
/// Resolves independently of the other entries in the same batch.
pub struct BatchHandle {
    receiver: oneshot::Receiver<BatchResult>,
}

impl BatchHandle {
    pub async fn wait(self) -> BatchResult {
        self.await
    }
}

impl Future for BatchHandle {
    type Output = BatchResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(ApiError::BatchDispatch {
                    message: "request was dropped before it was settled".to_string(),
                })
            })
        })
    }
}
