//! Collaborators the reconciler talks to

use api_types::PodInfo;
use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Pod;

use crate::domain::error::PodSourceError;
use crate::domain::error::StoreError;
use crate::domain::types::PodKey;

/// Read-only access to Pods and Nodes.
#[async_trait]
pub trait PodSource: Send + Sync {
    /// Current state of a Pod, `None` when it does not exist.
    async fn get_pod(&self, key: &PodKey) -> Result<Option<Pod>, Report<PodSourceError>>;

    /// Current state of a Node, `None` when it does not exist.
    async fn get_node(&self, node_name: &str) -> Result<Option<Node>, Report<PodSourceError>>;
}

/// Write access to the PodInfo collection of a single namespace.
#[async_trait]
pub trait PodInfoStore: Send + Sync {
    /// Namespace every record lives in.
    fn namespace(&self) -> &str;

    /// Creates `record`; fails with [`StoreError::AlreadyExists`] when a record
    /// of the same name is present.
    async fn create(&self, record: &PodInfo) -> Result<(), Report<StoreError>>;

    /// Deletes the record called `name`. Deleting an absent record succeeds.
    async fn delete(&self, name: &str) -> Result<(), Report<StoreError>>;

    /// Every record in the namespace.
    async fn list(&self) -> Result<Vec<PodInfo>, Report<StoreError>>;
}
