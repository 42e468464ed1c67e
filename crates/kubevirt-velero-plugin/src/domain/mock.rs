//! Test adapters implementing the collaborator traits
//!
//! In-memory stand-ins for the cluster so the backup item action can be
//! exercised without an API server.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::traits::ExclusionLabels;
use super::traits::PodLister;
use crate::infrastructure::k8s::KubernetesError;

/// Build a pod with the given labels and annotations.
pub fn pod(
    namespace: &str,
    name: &str,
    labels: &[(&str, &str)],
    annotations: &[(&str, &str)],
) -> Pod {
    let to_map = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };
    Pod {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            labels: Some(to_map(labels)),
            annotations: Some(to_map(annotations)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Pod lister serving a fixed set of pods, honoring equality label selectors.
#[derive(Default)]
pub struct MockPodLister {
    pods: Vec<Pod>,
    error_mode: bool,
    calls: AtomicUsize,
}

impl MockPodLister {
    pub fn new(pods: Vec<Pod>) -> Self {
        Self {
            pods,
            ..Default::default()
        }
    }

    /// A lister whose every call fails
    pub fn failing() -> Self {
        Self {
            error_mode: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn selector_matches(pod: &Pod, label_selector: &str) -> bool {
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    label_selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key.trim()).map(String::as_str) == Some(value.trim()),
            None => labels.contains_key(term),
        })
}

#[async_trait]
impl PodLister for MockPodLister {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, Report<KubernetesError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.error_mode {
            return Err(Report::new(KubernetesError::LookupFailed {
                kind: "Pod",
                namespace: namespace.to_string(),
                message: "mock pod lister failure".to_string(),
            }));
        }

        Ok(self
            .pods
            .iter()
            .filter(|pod| pod.metadata.namespace.as_deref() == Some(namespace))
            .filter(|pod| selector_matches(pod, label_selector))
            .cloned()
            .collect())
    }
}

/// Exclusion label lookups answered from in-memory sets of excluded names.
#[derive(Default)]
pub struct MockExclusionLabels {
    excluded_vms: HashSet<String>,
    excluded_pvcs: HashSet<String>,
    error_mode: bool,
}

impl MockExclusionLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_vm(mut self, name: &str) -> Self {
        self.excluded_vms.insert(name.to_string());
        self
    }

    pub fn exclude_pvc(mut self, name: &str) -> Self {
        self.excluded_pvcs.insert(name.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            error_mode: true,
            ..Default::default()
        }
    }

    fn lookup(
        &self,
        kind: &'static str,
        namespace: &str,
        name: &str,
        excluded: &HashSet<String>,
    ) -> Result<bool, Report<KubernetesError>> {
        if self.error_mode {
            return Err(Report::new(KubernetesError::LookupFailed {
                kind,
                namespace: namespace.to_string(),
                message: format!("mock label lookup failure for {name}"),
            }));
        }
        Ok(excluded.contains(name))
    }
}

#[async_trait]
impl ExclusionLabels for MockExclusionLabels {
    async fn is_vm_excluded(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, Report<KubernetesError>> {
        self.lookup("VirtualMachine", namespace, name, &self.excluded_vms)
    }

    async fn is_pvc_excluded(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, Report<KubernetesError>> {
        self.lookup("PersistentVolumeClaim", namespace, name, &self.excluded_pvcs)
    }
}
