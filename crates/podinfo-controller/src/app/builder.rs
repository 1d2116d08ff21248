use std::sync::Arc;

use anyhow::Result;

use crate::app::core::Application;
use crate::app::services::ApplicationServices;
use crate::app::services::DispatcherType;
use crate::config::RunArgs;
use crate::domain::IdentityCache;
use crate::domain::PodInfoReconciler;
use crate::domain::ReconcilerSettings;
use crate::infrastructure::dispatcher::Dispatcher;
use crate::infrastructure::dispatcher::DispatcherConfig;
use crate::infrastructure::k8s::KubePodInfoStore;
use crate::infrastructure::k8s::KubePodSource;
use crate::infrastructure::k8s::PodWatcher;
use crate::infrastructure::kube_client;

/// Application builder
pub struct ApplicationBuilder {
    run_args: RunArgs,
}

impl ApplicationBuilder {
    pub fn new(run_args: RunArgs) -> Self {
        Self { run_args }
    }

    /// Build complete application
    ///
    /// Fails when no Kubernetes client can be set up; nothing else is fatal.
    pub async fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let client = kube_client::init_kube_client(self.run_args.kubeconfig.as_deref())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize Kubernetes client: {e:?}"))?;

        let cache = Arc::new(IdentityCache::new());
        let settings = ReconcilerSettings::from(&self.run_args);
        tracing::info!(
            podinfo_namespace = %self.run_args.podinfo_namespace,
            alternate_scheduler = %settings.alternate_scheduler,
            cpu_request_source = %settings.cpu_request_source,
            "Reconciler configured"
        );

        let reconciler = PodInfoReconciler::new(
            KubePodSource::new(client.clone()),
            KubePodInfoStore::new(client.clone(), &self.run_args.podinfo_namespace),
            Arc::clone(&cache),
            settings,
        );
        let dispatcher: DispatcherType =
            Dispatcher::new(reconciler, DispatcherConfig::from(&self.run_args));

        let pod_watcher = Arc::new(PodWatcher::new(
            client,
            self.run_args.watch_namespace.clone(),
            dispatcher.clone(),
            Arc::clone(&cache),
        ));

        let services = ApplicationServices {
            cache,
            dispatcher,
            pod_watcher,
        };
        Ok(Application::new(services, self.run_args))
    }
}
