//! Level-triggered synchronization of PodInfo records with Pods
//!
//! Every invocation re-reads the Pod and decides from its current state and the
//! identity cache alone, so duplicated or reordered events converge to the same
//! result. An invocation issues at most one create or delete and mutates the
//! cache at most once; it never retries, failures go back to the dispatcher.

use std::sync::Arc;

use api_types::PodInfo;
use api_types::PodInfoSpec;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Pod;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::domain::eligibility;
use crate::domain::eligibility::Eligibility;
use crate::domain::eligibility::DEFAULT_ALTERNATE_SCHEDULER;
use crate::domain::error::ReconcileError;
use crate::domain::error::StoreError;
use crate::domain::identity_cache::IdentityCache;
use crate::domain::resources;
use crate::domain::resources::CpuRequestSource;
use crate::domain::traits::PodInfoStore;
use crate::domain::traits::PodSource;
use crate::domain::types::PodKey;
use crate::domain::types::PodPhase;
use crate::domain::types::ReconcileOutcome;
use crate::domain::types::SkipReason;

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Pods placed by this scheduler never get a PodInfo.
    pub alternate_scheduler: String,
    pub cpu_request_source: CpuRequestSource,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            alternate_scheduler: DEFAULT_ALTERNATE_SCHEDULER.to_string(),
            cpu_request_source: CpuRequestSource::default(),
        }
    }
}

pub struct PodInfoReconciler<P, S> {
    pods: P,
    store: S,
    cache: Arc<IdentityCache>,
    settings: ReconcilerSettings,
}

impl<P, S> PodInfoReconciler<P, S>
where
    P: PodSource,
    S: PodInfoStore,
{
    pub fn new(pods: P, store: S, cache: Arc<IdentityCache>, settings: ReconcilerSettings) -> Self {
        Self {
            pods,
            store,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    pub fn pods(&self) -> &P {
        &self.pods
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Brings the PodInfo of `key` in line with the Pod's current state.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::PodNotFound`] when the Pod is gone; its PodInfo has
    ///   been cleaned up already
    /// - [`ReconcileError::PodFetchFailed`] when the Pod could not be read; its
    ///   PodInfo has been cleaned up as well
    /// - [`ReconcileError::RecordCreateFailed`] / [`ReconcileError::RecordDeleteFailed`]
    ///   when the store rejected the mutation
    #[tracing::instrument(skip_all, fields(pod = %key))]
    pub async fn reconcile(
        &self,
        key: &PodKey,
    ) -> Result<ReconcileOutcome, Report<ReconcileError>> {
        let pod = match self.pods.get_pod(key).await {
            Ok(Some(pod)) => pod,
            Ok(None) => {
                self.forget_vanished_pod(key).await;
                return Err(Report::new(ReconcileError::PodNotFound { key: key.clone() }));
            }
            Err(report) => {
                warn!("Unable to fetch pod: {report:?}");
                self.forget_vanished_pod(key).await;
                return Err(
                    report.change_context(ReconcileError::PodFetchFailed { key: key.clone() })
                );
            }
        };

        let node_name = match eligibility::check(&pod, &self.settings.alternate_scheduler) {
            Eligibility::Eligible { node_name } => node_name,
            Eligibility::Ineligible(reason) => {
                debug!(%reason, "Skipping ineligible pod");
                return Ok(ReconcileOutcome::Skipped(SkipReason::Ineligible(reason)));
            }
        };

        if self.runs_on_control_plane(&node_name).await {
            info!(node_name = %node_name, "Skipping pod on control-plane node");
            return Ok(ReconcileOutcome::Skipped(SkipReason::ControlPlaneNode {
                node_name,
            }));
        }

        let phase = PodPhase::of(&pod);
        match self.tracked(key) {
            Some(tracked) if phase.is_terminal() => {
                self.delete_tracked(&key.name, &tracked, phase).await
            }
            Some(tracked) if tracked.spec.node_name == node_name => Ok(ReconcileOutcome::Unchanged),
            Some(tracked) => {
                warn!(
                    recorded = %tracked.spec.node_name,
                    current = %node_name,
                    "Node assignment changed, PodInfo left as recorded"
                );
                Ok(ReconcileOutcome::NodeReassignmentIgnored {
                    recorded: tracked.spec.node_name,
                    current: node_name,
                })
            }
            None if phase.is_terminal() => {
                debug!(%phase, "Skipping terminal pod without PodInfo");
                Ok(ReconcileOutcome::Skipped(SkipReason::TerminalUntracked))
            }
            None => self.create_record(key, &pod, node_name).await,
        }
    }

    /// Cache entry for the Pod's name.
    ///
    /// Entries are keyed by name only, so a same-named Pod in another
    /// namespace shares the entry; that is logged but not prevented.
    fn tracked(&self, key: &PodKey) -> Option<PodInfo> {
        let tracked = self.cache.get(&key.name)?;
        if let Some(recorded) = tracked.spec.pod_namespace.as_deref() {
            if recorded != key.namespace {
                warn!(
                    record = %tracked.record_name(),
                    recorded_namespace = %recorded,
                    "PodInfo was recorded for a same-named pod in another namespace"
                );
            }
        }
        Some(tracked)
    }

    /// Deletes the PodInfo of a Pod that could not be fetched and forgets it,
    /// whatever the store answers.
    async fn forget_vanished_pod(&self, key: &PodKey) {
        let Some(tracked) = self.tracked(key) else {
            return;
        };

        let record = tracked.record_name();
        info!(record = %record, "Deleting PodInfo of vanished pod");
        if let Err(report) = self.store.delete(record).await {
            error!("Failed to delete PodInfo {record}: {report:?}");
        }
        self.cache.remove(&key.name);
    }

    async fn delete_tracked(
        &self,
        pod_name: &str,
        tracked: &PodInfo,
        phase: PodPhase,
    ) -> Result<ReconcileOutcome, Report<ReconcileError>> {
        let record = tracked.record_name().to_string();
        info!(record = %record, %phase, "Deleting PodInfo of terminated pod");

        let deleted = self.store.delete(&record).await;
        self.cache.remove(pod_name);

        deleted.change_context(ReconcileError::RecordDeleteFailed {
            record: record.clone(),
        })?;
        Ok(ReconcileOutcome::Deleted { record })
    }

    async fn create_record(
        &self,
        key: &PodKey,
        pod: &Pod,
        node_name: String,
    ) -> Result<ReconcileOutcome, Report<ReconcileError>> {
        let claims = match resources::extract_cpu_claims(pod, self.settings.cpu_request_source) {
            Ok(claims) => claims,
            Err(missing) => {
                info!(%missing, "No PodInfo for pod without cpu data");
                return Ok(ReconcileOutcome::Skipped(SkipReason::ResourcesAbsent(missing)));
            }
        };

        let record = PodInfo::for_pod(
            self.store.namespace(),
            PodInfoSpec {
                pod_name: key.name.clone(),
                pod_namespace: Some(key.namespace.clone()),
                node_name,
                cpu_limit: claims.limit,
                cpu_request: claims.request,
            },
        );
        let record_name = record.record_name().to_string();

        match self.store.create(&record).await {
            Ok(()) => {
                info!(
                    record = %record_name,
                    node_name = %record.spec.node_name,
                    cpu_limit = claims.limit,
                    cpu_request = claims.request,
                    "Created PodInfo"
                );
                self.cache.insert(&key.name, record);
                Ok(ReconcileOutcome::Created {
                    record: record_name,
                })
            }
            Err(report) if matches!(report.current_context(), StoreError::AlreadyExists { .. }) => {
                info!(record = %record_name, "PodInfo already exists, tracking it");
                self.cache.insert(&key.name, record);
                Ok(ReconcileOutcome::Adopted {
                    record: record_name,
                })
            }
            Err(report) => {
                error!("Failed to create PodInfo {record_name}: {report:?}");
                Err(report.change_context(ReconcileError::RecordCreateFailed {
                    record: record_name,
                }))
            }
        }
    }

    /// Node lookup failures are not fatal: the Pod is then treated as running
    /// on a regular node.
    async fn runs_on_control_plane(&self, node_name: &str) -> bool {
        match self.pods.get_node(node_name).await {
            Ok(Some(node)) => eligibility::is_control_plane(&node),
            Ok(None) => {
                warn!(node_name = %node_name, "Node not found");
                false
            }
            Err(report) => {
                warn!("Can not get node {node_name}: {report:?}");
                false
            }
        }
    }

    /// Seeds the cache with PodInfos that already exist in the store.
    ///
    /// Returns the identities of the Pods the warmed records belong to, so the
    /// caller can reconcile them once; records without a Pod namespace cannot be
    /// traced back and are only tracked.
    pub async fn warm_cache(&self) -> Result<Vec<PodKey>, Report<StoreError>> {
        let records = self.store.list().await?;
        let mut keys = Vec::with_capacity(records.len());

        for record in records {
            let pod_name = record.spec.pod_name.clone();
            if pod_name.is_empty() {
                warn!(record = %record.record_name(), "Ignoring PodInfo without pod name");
                continue;
            }
            if let Some(namespace) = record.spec.pod_namespace.clone() {
                keys.push(PodKey::new(namespace, pod_name.clone()));
            }
            self.cache.insert(&pod_name, record);
        }

        info!(
            tracked = self.cache.len(),
            resync = keys.len(),
            "Warmed identity cache from existing PodInfos"
        );
        Ok(keys)
    }
}
