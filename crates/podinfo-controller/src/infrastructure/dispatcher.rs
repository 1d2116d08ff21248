//! Runs reconciliations on a bounded worker pool
//!
//! Requests are keyed by Pod identity. A key never runs on two workers at
//! once, a key that is queued but not started absorbs further requests, and
//! retryable failures come back after an exponential delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::DashSet;
use error_stack::Report;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;
use utils::keyed_lock::KeyedAsyncLock;

use crate::domain::error::ReconcileError;
use crate::domain::reconciler::PodInfoReconciler;
use crate::domain::traits::PodInfoStore;
use crate::domain::traits::PodSource;
use crate::domain::types::PodKey;
use crate::domain::types::ReconcileOutcome;

/// Work the dispatcher runs for a key.
#[async_trait]
pub trait ReconcileHandler: Send + Sync + 'static {
    async fn reconcile(&self, key: &PodKey) -> Result<ReconcileOutcome, Report<ReconcileError>>;
}

#[async_trait]
impl<P, S> ReconcileHandler for PodInfoReconciler<P, S>
where
    P: PodSource + 'static,
    S: PodInfoStore + 'static,
{
    async fn reconcile(&self, key: &PodKey) -> Result<ReconcileOutcome, Report<ReconcileError>> {
        PodInfoReconciler::reconcile(self, key).await
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Reconciliations allowed to run at the same time.
    pub workers: usize,
    pub requeue_base_delay: Duration,
    pub requeue_max_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            requeue_base_delay: Duration::from_millis(200),
            requeue_max_delay: Duration::from_secs(300),
        }
    }
}

impl DispatcherConfig {
    /// Delay before the retry following the `failures`-th consecutive failure.
    pub fn requeue_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.requeue_base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.requeue_max_delay)
    }
}

struct Shared<H> {
    handler: H,
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
    key_locks: KeyedAsyncLock<PodKey>,
    queued: DashSet<PodKey>,
    failures: DashMap<PodKey, u32>,
    shutdown: CancellationToken,
}

/// Cheap to clone; every clone feeds the same pool.
pub struct Dispatcher<H> {
    shared: Arc<Shared<H>>,
}

impl<H> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<H: ReconcileHandler> Dispatcher<H> {
    pub fn new(handler: H, config: DispatcherConfig) -> Self {
        let workers = config.workers.max(1);
        Self {
            shared: Arc::new(Shared {
                handler,
                permits: Arc::new(Semaphore::new(workers)),
                config,
                key_locks: KeyedAsyncLock::new(),
                queued: DashSet::new(),
                failures: DashMap::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn handler(&self) -> &H {
        &self.shared.handler
    }

    /// Asks for `key` to be reconciled.
    ///
    /// Returns immediately. A request for a key that is already waiting to run
    /// is dropped; a request for a key that is currently running queues one
    /// more run behind it.
    pub fn dispatch(&self, key: PodKey) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        if !self.shared.queued.insert(key.clone()) {
            debug!(pod = %key, "Reconciliation already queued");
            return;
        }

        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.run_queued(key).await });
    }

    /// Stops accepting work. Running reconciliations finish; queued ones and
    /// pending retries are dropped.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }

    /// Keys waiting for a worker or for their previous run to finish.
    pub fn queued_len(&self) -> usize {
        self.shared.queued.len()
    }

    async fn run_queued(&self, key: PodKey) {
        let shared = &self.shared;

        let acquired = tokio::select! {
            _ = shared.shutdown.cancelled() => None,
            acquired = async {
                let guard = shared.key_locks.lock(&key).await;
                let permit = Arc::clone(&shared.permits).acquire_owned().await;
                (guard, permit)
            } => Some(acquired),
        };
        // From here on a new request for the key queues another run.
        shared.queued.remove(&key);

        let Some((guard, Ok(permit))) = acquired else {
            return;
        };

        let result = shared.handler.reconcile(&key).await;
        drop(permit);
        drop(guard);

        match result {
            Ok(outcome) => {
                shared.failures.remove(&key);
                debug!(pod = %key, ?outcome, "Reconciliation finished");
            }
            Err(report) if report.current_context().is_retryable() => {
                let failures = {
                    let mut entry = shared.failures.entry(key.clone()).or_insert(0);
                    *entry = entry.saturating_add(1);
                    *entry
                };
                let delay = shared.config.requeue_delay(failures);
                warn!(
                    pod = %key,
                    failures,
                    ?delay,
                    "Reconciliation failed, requeueing: {report:?}"
                );
                self.requeue_after(key, delay);
            }
            Err(report) => {
                shared.failures.remove(&key);
                info!(pod = %key, "Reconciliation ended without retry: {report}");
            }
        }
    }

    fn requeue_after(&self, key: PodKey, delay: Duration) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = dispatcher.shared.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => dispatcher.dispatch(key),
            }
        });
    }
}
