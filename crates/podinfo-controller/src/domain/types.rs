use std::fmt;

use k8s_openapi::api::core::v1::Pod;

use crate::domain::eligibility::IneligibleReason;
use crate::domain::resources::MissingCpuData;

/// Namespace-qualified identity of a Pod.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a watched Pod; `None` when the object carries no name.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.clone()?;
        let namespace = pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        Some(Self { namespace, name })
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Lifecycle phase reported in `status.phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn of(pod: &Pod) -> Self {
        match pod
            .status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
        {
            Some("Pending") => Self::Pending,
            Some("Running") => Self::Running,
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// No further placement is expected once a Pod failed or succeeded.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// What a single reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A PodInfo was created and is now tracked.
    Created { record: String },
    /// A PodInfo already existed remotely and is now tracked.
    Adopted { record: String },
    /// The tracked PodInfo was deleted.
    Deleted { record: String },
    /// The tracked PodInfo still matches the Pod.
    Unchanged,
    /// The Pod moved to another node after its PodInfo was created; left as is.
    NodeReassignmentIgnored { recorded: String, current: String },
    /// Nothing to do for this Pod.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SkipReason {
    #[display("ineligible: {_0}")]
    Ineligible(IneligibleReason),
    #[display("pod runs on control-plane node {node_name}")]
    ControlPlaneNode { node_name: String },
    #[display("no cpu data: {_0}")]
    ResourcesAbsent(MissingCpuData),
    #[display("pod is terminal and untracked")]
    TerminalUntracked,
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::PodStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use similar_asserts::assert_eq;

    use super::*;

    fn pod_in_phase(phase: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("p1".to_string()),
                ..Default::default()
            },
            spec: None,
            status: Some(PodStatus {
                phase: phase.map(str::to_string),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn key_defaults_namespace_and_requires_name() {
        let pod = pod_in_phase(None);
        assert_eq!(PodKey::from_pod(&pod), Some(PodKey::new("default", "p1")));

        let nameless = Pod::default();
        assert_eq!(PodKey::from_pod(&nameless), None);
    }

    #[test]
    fn key_displays_as_namespaced_name() {
        assert_eq!(PodKey::new("apps", "web-0").to_string(), "apps/web-0");
    }

    #[test]
    fn only_failed_and_succeeded_are_terminal() {
        let cases = [
            (Some("Running"), PodPhase::Running, false),
            (Some("Pending"), PodPhase::Pending, false),
            (Some("Succeeded"), PodPhase::Succeeded, true),
            (Some("Failed"), PodPhase::Failed, true),
            (Some("Evicted"), PodPhase::Unknown, false),
            (None, PodPhase::Unknown, false),
        ];

        for (raw, expected, terminal) in cases {
            let phase = PodPhase::of(&pod_in_phase(raw));
            assert_eq!(phase, expected, "phase {raw:?}");
            assert_eq!(phase.is_terminal(), terminal, "terminal {raw:?}");
        }
    }
}
