//! Collaborators consulted by the backup item action

use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::core::v1::Pod;

use crate::infrastructure::k8s::KubernetesError;

/// Lists pods of a namespace.
#[async_trait]
pub trait PodLister: Send + Sync {
    /// List pods in `namespace` matching a label selector such as `app=web`
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, Report<KubernetesError>>;
}

/// Answers whether objects carry the backup exclusion label.
#[async_trait]
pub trait ExclusionLabels: Send + Sync {
    /// Check the named `VirtualMachine`
    async fn is_vm_excluded(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, Report<KubernetesError>>;

    /// Check the named `PersistentVolumeClaim`
    async fn is_pvc_excluded(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, Report<KubernetesError>>;
}
