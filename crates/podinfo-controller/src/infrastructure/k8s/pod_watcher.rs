use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use api_types::PodInfo;
use error_stack::Report;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::watcher::watcher;
use kube::runtime::watcher::Config;
use kube::runtime::watcher::Event;
use kube::Api;
use kube::Client;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::domain::types::PodKey;
use crate::domain::IdentityCache;
use crate::infrastructure::dispatcher::Dispatcher;
use crate::infrastructure::dispatcher::ReconcileHandler;
use crate::infrastructure::k8s::KubernetesError;

const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Watches Pods and requests a reconciliation for every Pod that changes.
///
/// Additions, updates and deletions all map to the same request: the
/// reconciler reads the Pod again and works out what to do. When the watch
/// re-lists, tracked Pods missing from the listing are requested as well,
/// since their deletion happened while nobody was watching.
pub struct PodWatcher<H> {
    client: Client,
    namespace: Option<String>,
    dispatcher: Dispatcher<H>,
    cache: Arc<IdentityCache>,
}

impl<H: ReconcileHandler> PodWatcher<H> {
    pub fn new(
        client: Client,
        namespace: Option<String>,
        dispatcher: Dispatcher<H>,
        cache: Arc<IdentityCache>,
    ) -> Self {
        Self {
            client,
            namespace,
            dispatcher,
            cache,
        }
    }

    /// Watch Pods until cancelled.
    ///
    /// The watch is restarted whenever the stream ends or fails.
    #[tracing::instrument(skip_all, fields(namespace = ?self.namespace))]
    pub async fn run(&self, cancellation_token: CancellationToken) {
        info!("Starting pod watcher");
        loop {
            select! {
                _ = cancellation_token.cancelled() => {
                    info!("Pod watcher shutdown requested");
                    break;
                }
                result = self.watch_pods() => {
                    match result {
                        Ok(()) => {
                            warn!("Pod watch stream ended unexpectedly, restarting...");
                        }
                        Err(e) => {
                            error!("Pod watch failed: {e:?}");
                            select! {
                                _ = cancellation_token.cancelled() => break,
                                _ = tokio::time::sleep(RESTART_DELAY) => {}
                            }
                        }
                    }
                }
            }
        }
    }

    fn api(&self) -> Api<Pod> {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    /// Watch pods and dispatch their keys.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::WatchFailed`] if the watch stream reports an error
    async fn watch_pods(&self) -> Result<(), Report<KubernetesError>> {
        let mut stream = watcher(self.api(), Config::default()).boxed();

        while let Some(event) = stream.next().await {
            match event {
                Ok(Event::Applied(pod)) | Ok(Event::Deleted(pod)) => self.handle_pod(&pod),
                Ok(Event::Restarted(pods)) => self.handle_relist(&pods),
                Err(e) => {
                    return Err(Report::new(KubernetesError::WatchFailed {
                        message: format!("Watch stream error: {e}"),
                    }));
                }
            }
        }

        Ok(())
    }

    fn handle_pod(&self, pod: &Pod) {
        match PodKey::from_pod(pod) {
            Some(key) => self.dispatcher.dispatch(key),
            None => debug!("Ignoring pod event without a name"),
        }
    }

    fn handle_relist(&self, pods: &[Pod]) {
        let tracked = self.cache.snapshot();
        let vanished = vanished_tracked_pods(&tracked, pods, self.namespace.as_deref());
        info!(listed = pods.len(), vanished = vanished.len(), "Pod watch (re)listed");
        for key in vanished {
            self.dispatcher.dispatch(key);
        }
        for pod in pods {
            self.handle_pod(pod);
        }
    }
}

/// Pods that still have a tracked record but are absent from a full listing.
///
/// Records without a Pod namespace cannot be traced back and are skipped, as
/// are records outside the watched namespace.
pub(crate) fn vanished_tracked_pods(
    tracked: &[PodInfo],
    listed: &[Pod],
    watched_namespace: Option<&str>,
) -> Vec<PodKey> {
    let listed: HashSet<PodKey> = listed.iter().filter_map(PodKey::from_pod).collect();

    tracked
        .iter()
        .filter_map(|record| {
            let namespace = record.spec.pod_namespace.as_deref()?;
            if watched_namespace.is_some_and(|watched| watched != namespace) {
                return None;
            }
            Some(PodKey::new(namespace, record.spec.pod_name.as_str()))
        })
        .filter(|key| !listed.contains(key))
        .collect()
}
