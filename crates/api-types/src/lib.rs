//! Shared API type definitions
//!
//! This crate contains the `PodInfo` custom resource mirrored by the controller
//! and the response formats served by its query API. Consumers such as a custom
//! scheduler or capacity planner can depend on it to read PodInfo records without
//! pulling in the controller itself.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Prefix prepended to a Pod name to form the name of its PodInfo record.
pub const RECORD_NAME_PREFIX: &str = "podinfo-";

/// Returns the deterministic PodInfo name for a Pod.
pub fn record_name_for(pod_name: &str) -> String {
    format!("{RECORD_NAME_PREFIX}{pod_name}")
}

/// Placement and CPU claims of a single running Pod.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "flux.fluxframework.io",
    version = "v1",
    kind = "PodInfo",
    plural = "podinfoes",
    namespaced,
    status = "PodInfoStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Pod","type":"string","jsonPath":".spec.podName"}"#,
    printcolumn = r#"{"name":"Node","type":"string","jsonPath":".spec.nodeName"}"#,
    printcolumn = r#"{"name":"CPU Limit","type":"integer","jsonPath":".spec.cpuLimit"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PodInfoSpec {
    /// Name of the source Pod
    pub pod_name: String,
    /// Namespace of the source Pod, used to resync after a restart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_namespace: Option<String>,
    /// Node the Pod is assigned to
    pub node_name: String,
    /// CPU limit of the primary container, in whole cores
    pub cpu_limit: i64,
    /// CPU request of the primary container, in whole cores
    pub cpu_request: i64,
}

/// Reserved for future use; always empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PodInfoStatus {}

impl PodInfo {
    /// Builds the PodInfo record for a Pod, placed in `namespace`.
    pub fn for_pod(namespace: &str, spec: PodInfoSpec) -> Self {
        let mut record = PodInfo::new(&record_name_for(&spec.pod_name), spec);
        record.metadata.namespace = Some(namespace.to_string());
        record.status = Some(PodInfoStatus::default());
        record
    }

    /// Name of the record, empty if the server returned one without metadata.
    pub fn record_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

/// Response format for a single tracked PodInfo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodInfoResponse {
    /// Whether the request was successful
    pub success: bool,
    /// PodInfo data (present when successful)
    pub data: Option<TrackedPodInfo>,
    /// Response message
    pub message: String,
}

/// Response format listing every tracked PodInfo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodInfoListResponse {
    pub count: usize,
    pub items: Vec<TrackedPodInfo>,
}

/// A PodInfo as known to the controller's identity cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedPodInfo {
    pub record_name: String,
    pub record_namespace: Option<String>,
    #[serde(flatten)]
    pub spec: PodInfoSpec,
}

impl From<&PodInfo> for TrackedPodInfo {
    fn from(record: &PodInfo) -> Self {
        Self {
            record_name: record.record_name().to_string(),
            record_namespace: record.metadata.namespace.clone(),
            spec: record.spec.clone(),
        }
    }
}
