use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::Client;

use crate::domain::error::PodSourceError;
use crate::domain::traits::PodSource;
use crate::domain::types::PodKey;

/// Reads Pods and Nodes straight from the API server.
#[derive(Clone)]
pub struct KubePodSource {
    client: Client,
    nodes: Api<Node>,
}

impl KubePodSource {
    pub fn new(client: Client) -> Self {
        Self {
            nodes: Api::all(client.clone()),
            client,
        }
    }
}

#[async_trait]
impl PodSource for KubePodSource {
    async fn get_pod(&self, key: &PodKey) -> Result<Option<Pod>, Report<PodSourceError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name)
            .await
            .change_context(PodSourceError::PodRequestFailed { key: key.clone() })
    }

    async fn get_node(&self, node_name: &str) -> Result<Option<Node>, Report<PodSourceError>> {
        self.nodes
            .get_opt(node_name)
            .await
            .change_context(PodSourceError::NodeRequestFailed {
                node_name: node_name.to_string(),
            })
    }
}
