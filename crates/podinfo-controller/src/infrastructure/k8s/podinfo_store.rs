use api_types::PodInfo;
use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use kube::api::DeleteParams;
use kube::api::ListParams;
use kube::api::PostParams;
use kube::Api;
use kube::Client;
use tracing::debug;

use crate::domain::error::StoreError;
use crate::domain::traits::PodInfoStore;
use crate::infrastructure::k8s::is_already_exists;
use crate::infrastructure::k8s::is_not_found;

/// PodInfo custom resources in one namespace.
#[derive(Clone)]
pub struct KubePodInfoStore {
    api: Api<PodInfo>,
    namespace: String,
}

impl KubePodInfoStore {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl PodInfoStore for KubePodInfoStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create(&self, record: &PodInfo) -> Result<(), Report<StoreError>> {
        let name = record.record_name().to_string();
        match self.api.create(&PostParams::default(), record).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Err(Report::new(e)
                .change_context(StoreError::AlreadyExists { name })),
            Err(e) => Err(Report::new(e).change_context(StoreError::CreateFailed { name })),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), Report<StoreError>> {
        match self.api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(record = name, "PodInfo already gone");
                Ok(())
            }
            Err(e) => Err(Report::new(e).change_context(StoreError::DeleteFailed {
                name: name.to_string(),
            })),
        }
    }

    async fn list(&self) -> Result<Vec<PodInfo>, Report<StoreError>> {
        let list = self
            .api
            .list(&ListParams::default())
            .await
            .change_context(StoreError::ListFailed {
                namespace: self.namespace.clone(),
            })?;
        Ok(list.items)
    }
}
