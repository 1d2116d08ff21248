use core::error::Error;

use crate::domain::types::PodKey;

/// Errors a reconciliation hands back to the dispatcher.
#[derive(Debug, derive_more::Display)]
pub enum ReconcileError {
    #[display("Pod {key} not found")]
    PodNotFound { key: PodKey },
    #[display("Failed to fetch pod {key}")]
    PodFetchFailed { key: PodKey },
    #[display("Failed to create PodInfo {record}")]
    RecordCreateFailed { record: String },
    #[display("Failed to delete PodInfo {record}")]
    RecordDeleteFailed { record: String },
}

impl Error for ReconcileError {}

impl ReconcileError {
    /// Whether running the reconciliation again may lead somewhere else.
    ///
    /// A vanished Pod has already been cleaned up and stays vanished; every
    /// other failure is an API hiccup worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::PodNotFound { .. })
    }
}

/// Errors raised by a [`PodSource`](crate::domain::traits::PodSource).
#[derive(Debug, derive_more::Display)]
pub enum PodSourceError {
    #[display("Failed to get pod {key}")]
    PodRequestFailed { key: PodKey },
    #[display("Failed to get node {node_name}")]
    NodeRequestFailed { node_name: String },
}

impl Error for PodSourceError {}

/// Errors raised by a [`PodInfoStore`](crate::domain::traits::PodInfoStore).
#[derive(Debug, PartialEq, Eq, derive_more::Display)]
pub enum StoreError {
    #[display("PodInfo {name} already exists")]
    AlreadyExists { name: String },
    #[display("Failed to create PodInfo {name}")]
    CreateFailed { name: String },
    #[display("Failed to delete PodInfo {name}")]
    DeleteFailed { name: String },
    #[display("Failed to list PodInfos in namespace {namespace}")]
    ListFailed { namespace: String },
}

impl Error for StoreError {}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn display_formatting() {
        let key = PodKey::new("default", "p1");

        assert_eq!(
            ReconcileError::PodNotFound { key: key.clone() }.to_string(),
            "Pod default/p1 not found"
        );
        assert_eq!(
            ReconcileError::RecordDeleteFailed {
                record: "podinfo-p1".to_string()
            }
            .to_string(),
            "Failed to delete PodInfo podinfo-p1"
        );
        assert_eq!(
            PodSourceError::PodRequestFailed { key }.to_string(),
            "Failed to get pod default/p1"
        );
        assert_eq!(
            StoreError::AlreadyExists {
                name: "podinfo-p1".to_string()
            }
            .to_string(),
            "PodInfo podinfo-p1 already exists"
        );
    }

    #[test]
    fn only_not_found_is_final() {
        let key = PodKey::new("default", "p1");

        assert!(!ReconcileError::PodNotFound { key: key.clone() }.is_retryable());
        assert!(ReconcileError::PodFetchFailed { key }.is_retryable());
        assert!(ReconcileError::RecordCreateFailed {
            record: "podinfo-p1".to_string()
        }
        .is_retryable());
    }
}
