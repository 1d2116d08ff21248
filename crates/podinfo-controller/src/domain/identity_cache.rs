//! Process-local record of which PodInfo the controller believes exists per Pod
//!
//! The PodInfo store stays authoritative; this cache only remembers what the
//! reconciler created, so it can drift when a remote call silently fails or
//! someone edits PodInfos behind the controller's back.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use api_types::PodInfo;

/// Pod name -> PodInfo created for it.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: Mutex<HashMap<String, PodInfo>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, PodInfo>> {
        // critical sections are single map operations; a poisoned map is intact
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, pod_name: &str) -> Option<PodInfo> {
        self.entries().get(pod_name).cloned()
    }

    pub fn contains(&self, pod_name: &str) -> bool {
        self.entries().contains_key(pod_name)
    }

    /// Tracks `record` for `pod_name`, returning the record it replaces.
    pub fn insert(&self, pod_name: &str, record: PodInfo) -> Option<PodInfo> {
        self.entries().insert(pod_name.to_string(), record)
    }

    pub fn remove(&self, pod_name: &str) -> Option<PodInfo> {
        self.entries().remove(pod_name)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Copy of every tracked record, ordered by Pod name.
    pub fn snapshot(&self) -> Vec<PodInfo> {
        let mut records: Vec<PodInfo> = self.entries().values().cloned().collect();
        records.sort_by(|a, b| a.spec.pod_name.cmp(&b.spec.pod_name));
        records
    }
}
