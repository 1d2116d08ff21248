//! In-memory adapters for the collaborator traits
//!
//! Used by unit and integration tests to drive the reconciler without a
//! cluster. The store records every call so tests can assert on exactly which
//! remote mutations a reconciliation issued.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use api_types::PodInfo;
use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::api::core::v1::PodStatus;
use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::domain::eligibility::CONTROL_PLANE_LABELS;
use crate::domain::error::PodSourceError;
use crate::domain::error::StoreError;
use crate::domain::resources::CPU_RESOURCE;
use crate::domain::traits::PodInfoStore;
use crate::domain::traits::PodSource;
use crate::domain::types::PodKey;

/// Mock Pod/Node source backed by maps
#[derive(Default)]
pub struct MockPodSource {
    pods: Mutex<HashMap<PodKey, Pod>>,
    nodes: Mutex<HashMap<String, Node>>,
    pod_error_mode: AtomicBool,
    node_error_mode: AtomicBool,
}

impl MockPodSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a Pod; pods without a name are ignored.
    pub fn put_pod(&self, pod: Pod) {
        if let Some(key) = PodKey::from_pod(&pod) {
            self.pods.lock().unwrap().insert(key, pod);
        }
    }

    pub fn remove_pod(&self, key: &PodKey) {
        self.pods.lock().unwrap().remove(key);
    }

    pub fn put_node(&self, node: Node) {
        let name = node.metadata.name.clone().unwrap_or_default();
        self.nodes.lock().unwrap().insert(name, node);
    }

    /// Makes every Pod lookup fail with an API error.
    pub fn set_pod_error_mode(&self, enabled: bool) {
        self.pod_error_mode.store(enabled, Ordering::SeqCst);
    }

    /// Makes every Node lookup fail with an API error.
    pub fn set_node_error_mode(&self, enabled: bool) {
        self.node_error_mode.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl PodSource for MockPodSource {
    async fn get_pod(&self, key: &PodKey) -> Result<Option<Pod>, Report<PodSourceError>> {
        if self.pod_error_mode.load(Ordering::SeqCst) {
            return Err(Report::new(PodSourceError::PodRequestFailed { key: key.clone() })
                .attach_printable("mock error mode enabled"));
        }
        Ok(self.pods.lock().unwrap().get(key).cloned())
    }

    async fn get_node(&self, node_name: &str) -> Result<Option<Node>, Report<PodSourceError>> {
        if self.node_error_mode.load(Ordering::SeqCst) {
            return Err(Report::new(PodSourceError::NodeRequestFailed {
                node_name: node_name.to_string(),
            })
            .attach_printable("mock error mode enabled"));
        }
        Ok(self.nodes.lock().unwrap().get(node_name).cloned())
    }
}

/// A call received by [`MockPodInfoStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Create(Box<PodInfo>),
    Delete(String),
    List,
}

/// Mock PodInfo store that records calls
pub struct MockPodInfoStore {
    namespace: String,
    records: Mutex<BTreeMap<String, PodInfo>>,
    calls: Mutex<Vec<StoreCall>>,
    create_error_mode: AtomicBool,
    delete_error_mode: AtomicBool,
}

impl MockPodInfoStore {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            records: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            create_error_mode: AtomicBool::new(false),
            delete_error_mode: AtomicBool::new(false),
        }
    }

    /// Places a record in the store without recording a call.
    pub fn seed(&self, record: PodInfo) {
        let name = record.record_name().to_string();
        self.records.lock().unwrap().insert(name, record);
    }

    pub fn records(&self) -> Vec<PodInfo> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Create and delete calls only.
    pub fn mutating_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, StoreCall::List))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn set_create_error_mode(&self, enabled: bool) {
        self.create_error_mode.store(enabled, Ordering::SeqCst);
    }

    pub fn set_delete_error_mode(&self, enabled: bool) {
        self.delete_error_mode.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl PodInfoStore for MockPodInfoStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create(&self, record: &PodInfo) -> Result<(), Report<StoreError>> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Create(Box::new(record.clone())));

        let name = record.record_name().to_string();
        if self.create_error_mode.load(Ordering::SeqCst) {
            return Err(Report::new(StoreError::CreateFailed { name }));
        }

        let mut records = self.records.lock().unwrap();
        if records.contains_key(&name) {
            return Err(Report::new(StoreError::AlreadyExists { name }));
        }
        records.insert(name, record.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), Report<StoreError>> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Delete(name.to_string()));

        if self.delete_error_mode.load(Ordering::SeqCst) {
            return Err(Report::new(StoreError::DeleteFailed {
                name: name.to_string(),
            }));
        }
        self.records.lock().unwrap().remove(name);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PodInfo>, Report<StoreError>> {
        self.calls.lock().unwrap().push(StoreCall::List);
        Ok(self.records())
    }
}

/// Builds Pods for tests; starts as a Running Pod of the default scheduler with
/// one container and no resources.
pub struct PodBuilder {
    pod: Pod,
}

impl PodBuilder {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            pod: Pod {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some(namespace.to_string()),
                    ..Default::default()
                },
                spec: Some(PodSpec {
                    scheduler_name: Some("default-scheduler".to_string()),
                    containers: vec![Container {
                        name: "main".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                status: Some(PodStatus {
                    phase: Some("Running".to_string()),
                    ..Default::default()
                }),
            },
        }
    }

    fn spec(&mut self) -> &mut PodSpec {
        self.pod.spec.get_or_insert_with(PodSpec::default)
    }

    fn resources(&mut self) -> &mut ResourceRequirements {
        let spec = self.spec();
        if spec.containers.is_empty() {
            spec.containers.push(Container {
                name: "main".to_string(),
                ..Default::default()
            });
        }
        spec.containers[0]
            .resources
            .get_or_insert_with(ResourceRequirements::default)
    }

    pub fn node(mut self, node_name: &str) -> Self {
        self.spec().node_name = Some(node_name.to_string());
        self
    }

    pub fn scheduler(mut self, scheduler_name: &str) -> Self {
        self.spec().scheduler_name = Some(scheduler_name.to_string());
        self
    }

    pub fn phase(mut self, phase: &str) -> Self {
        self.pod
            .status
            .get_or_insert_with(PodStatus::default)
            .phase = Some(phase.to_string());
        self
    }

    pub fn cpu_limit(mut self, quantity: &str) -> Self {
        self.resources()
            .limits
            .get_or_insert_with(BTreeMap::new)
            .insert(CPU_RESOURCE.to_string(), Quantity(quantity.to_string()));
        self
    }

    pub fn cpu_request(mut self, quantity: &str) -> Self {
        self.resources()
            .requests
            .get_or_insert_with(BTreeMap::new)
            .insert(CPU_RESOURCE.to_string(), Quantity(quantity.to_string()));
        self
    }

    pub fn without_containers(mut self) -> Self {
        self.spec().containers.clear();
        self
    }

    pub fn build(self) -> Pod {
        self.pod
    }
}

/// A Node, labelled as control plane when asked.
pub fn node(name: &str, control_plane: bool) -> Node {
    let labels = if control_plane {
        BTreeMap::from([(CONTROL_PLANE_LABELS[0].to_string(), String::new())])
    } else {
        BTreeMap::from([("kubernetes.io/hostname".to_string(), name.to_string())])
    };

    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}
