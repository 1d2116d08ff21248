use anyhow::Result;

use crate::app::services::ApplicationServices;
use crate::app::tasks::Tasks;
use crate::config::RunArgs;

/// Application core structure with explicit dependencies
pub struct Application {
    services: ApplicationServices,
    run_args: RunArgs,
}

impl Application {
    pub fn new(services: ApplicationServices, run_args: RunArgs) -> Self {
        Self { services, run_args }
    }

    pub fn services(&self) -> &ApplicationServices {
        &self.services
    }

    pub fn run_args(&self) -> &RunArgs {
        &self.run_args
    }

    /// Run application, start all tasks and wait for completion
    pub async fn run(&self) -> Result<()> {
        if self.run_args.resync_on_start {
            self.resync().await;
        }

        tracing::info!("Starting all application tasks...");
        let mut tasks = Tasks::new();

        if let Err(e) = tasks.spawn_all_tasks(self) {
            tracing::error!("Failed to spawn application tasks: {}", e);
            return Err(e);
        }

        if let Err(e) = tasks.wait_for_completion().await {
            tracing::error!("Error during task execution: {}", e);
            return Err(e);
        }

        tracing::info!("Application run completed");
        Ok(())
    }

    /// Gracefully shutdown application
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down application...");
        self.services.dispatcher.shutdown();
        tracing::info!("Application shutdown completed");
        Ok(())
    }

    /// Seeds the cache from the records already in the cluster and re-checks
    /// their Pods, so records of Pods that vanished while the controller was
    /// down get cleaned up.
    async fn resync(&self) {
        let dispatcher = &self.services.dispatcher;
        match dispatcher.handler().warm_cache().await {
            Ok(keys) => {
                for key in keys {
                    dispatcher.dispatch(key);
                }
            }
            Err(e) => {
                tracing::warn!("Startup resync skipped, existing PodInfos unknown: {e:?}");
            }
        }
    }
}
