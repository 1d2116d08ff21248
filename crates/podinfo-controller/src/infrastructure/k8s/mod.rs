//! Kubernetes integration module.
//!
//! This module connects the reconciler to the cluster:
//! - [`KubePodSource`]: reads Pods and Nodes through the API server
//! - [`KubePodInfoStore`]: creates, deletes and lists PodInfo resources
//! - [`PodWatcher`]: turns Pod watch events into reconciliation requests

use core::error::Error;

pub mod pod_source;
pub mod pod_watcher;
pub mod podinfo_store;

pub use pod_source::KubePodSource;
pub use pod_watcher::PodWatcher;
pub use podinfo_store::KubePodInfoStore;

/// Errors that can occur while talking to Kubernetes outside a reconciliation.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to watch pods: {message}")]
    WatchFailed { message: String },
}

impl Error for KubernetesError {}

/// Whether a kube error is the API server's answer for a missing object.
pub(crate) fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

/// Whether a kube error is the API server's answer for a name collision.
pub(crate) fn is_already_exists(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 409)
}

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;

    use super::*;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} test"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn classifies_api_errors_by_status_code() {
        assert!(is_not_found(&api_error(404, "NotFound")));
        assert!(!is_not_found(&api_error(409, "AlreadyExists")));
        assert!(is_already_exists(&api_error(409, "AlreadyExists")));
        assert!(!is_already_exists(&api_error(500, "InternalError")));
    }

    #[test]
    fn error_display_formatting() {
        let err = KubernetesError::WatchFailed {
            message: "stream closed".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to watch pods: stream closed");
    }
}
