use std::sync::Arc;

use crate::domain::IdentityCache;
use crate::domain::PodInfoReconciler;
use crate::infrastructure::dispatcher::Dispatcher;
use crate::infrastructure::k8s::KubePodInfoStore;
use crate::infrastructure::k8s::KubePodSource;
use crate::infrastructure::k8s::PodWatcher;

/// Reconciler bound to the cluster
pub type ReconcilerType = PodInfoReconciler<KubePodSource, KubePodInfoStore>;

pub type DispatcherType = Dispatcher<ReconcilerType>;

/// Application dependencies - simple struct with Arc-wrapped services
pub struct ApplicationServices {
    pub cache: Arc<IdentityCache>,
    pub dispatcher: DispatcherType,
    pub pod_watcher: Arc<PodWatcher<ReconcilerType>>,
}
