//! Decides which Pods get a PodInfo at all

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Pod;

/// Scheduler name of the alternate scheduler that keeps its own bookkeeping.
pub const DEFAULT_ALTERNATE_SCHEDULER: &str = "scheduling-plugin";

/// Node labels marking a control-plane node.
pub const CONTROL_PLANE_LABELS: [&str; 2] = [
    "node-role.kubernetes.io/master",
    "node-role.kubernetes.io/control-plane",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible { node_name: String },
    Ineligible(IneligibleReason),
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum IneligibleReason {
    #[display("pod is not scheduled")]
    Unscheduled,
    #[display("pod is placed by scheduler {scheduler_name}")]
    AlternateScheduler { scheduler_name: String },
}

/// Applies the eligibility rules in order; the first matching rule wins.
pub fn check(pod: &Pod, alternate_scheduler: &str) -> Eligibility {
    let spec = pod.spec.as_ref();

    let node_name = spec
        .and_then(|spec| spec.node_name.as_deref())
        .unwrap_or_default();
    if node_name.is_empty() {
        return Eligibility::Ineligible(IneligibleReason::Unscheduled);
    }

    if let Some(scheduler_name) = spec.and_then(|spec| spec.scheduler_name.as_deref()) {
        if scheduler_name == alternate_scheduler {
            return Eligibility::Ineligible(IneligibleReason::AlternateScheduler {
                scheduler_name: scheduler_name.to_string(),
            });
        }
    }

    Eligibility::Eligible {
        node_name: node_name.to_string(),
    }
}

pub fn is_eligible(pod: &Pod, alternate_scheduler: &str) -> bool {
    matches!(check(pod, alternate_scheduler), Eligibility::Eligible { .. })
}

pub fn is_control_plane(node: &Node) -> bool {
    node.metadata.labels.as_ref().is_some_and(|labels| {
        CONTROL_PLANE_LABELS
            .iter()
            .any(|label| labels.contains_key(*label))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::PodSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use similar_asserts::assert_eq;

    use super::*;

    fn pod(node_name: Option<&str>, scheduler_name: Option<&str>) -> Pod {
        Pod {
            spec: Some(PodSpec {
                node_name: node_name.map(str::to_string),
                scheduler_name: scheduler_name.map(str::to_string),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn node_with_labels(labels: &[&str]) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some("n1".to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|label| (label.to_string(), String::new()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn scheduled_default_pod_is_eligible() {
        let pod = pod(Some("n1"), Some("default-scheduler"));

        assert_eq!(
            check(&pod, DEFAULT_ALTERNATE_SCHEDULER),
            Eligibility::Eligible {
                node_name: "n1".to_string()
            }
        );
    }

    #[test]
    fn empty_or_missing_node_is_unscheduled() {
        for node_name in [None, Some("")] {
            let pod = pod(node_name, Some("default-scheduler"));
            assert_eq!(
                check(&pod, DEFAULT_ALTERNATE_SCHEDULER),
                Eligibility::Ineligible(IneligibleReason::Unscheduled)
            );
        }
        assert!(!is_eligible(&Pod::default(), DEFAULT_ALTERNATE_SCHEDULER));
    }

    #[test]
    fn alternate_scheduler_is_ineligible() {
        let pod = pod(Some("n1"), Some(DEFAULT_ALTERNATE_SCHEDULER));

        assert_eq!(
            check(&pod, DEFAULT_ALTERNATE_SCHEDULER),
            Eligibility::Ineligible(IneligibleReason::AlternateScheduler {
                scheduler_name: DEFAULT_ALTERNATE_SCHEDULER.to_string()
            })
        );
    }

    #[test]
    fn unscheduled_rule_wins_over_scheduler_rule() {
        let pod = pod(None, Some(DEFAULT_ALTERNATE_SCHEDULER));

        assert_eq!(
            check(&pod, DEFAULT_ALTERNATE_SCHEDULER),
            Eligibility::Ineligible(IneligibleReason::Unscheduled)
        );
    }

    #[test]
    fn alternate_scheduler_name_is_configurable() {
        let pod = pod(Some("n1"), Some("kube-flux"));

        assert!(is_eligible(&pod, DEFAULT_ALTERNATE_SCHEDULER));
        assert!(!is_eligible(&pod, "kube-flux"));
    }

    #[test]
    fn control_plane_labels_are_detected() {
        assert!(is_control_plane(&node_with_labels(&[
            "node-role.kubernetes.io/master"
        ])));
        assert!(is_control_plane(&node_with_labels(&[
            "node-role.kubernetes.io/control-plane"
        ])));
        assert!(!is_control_plane(&node_with_labels(&[
            "node-role.kubernetes.io/worker"
        ])));
        assert!(!is_control_plane(&Node::default()));
    }
}
