use async_trait::async_trait;
use backup_types::KUBEVIRT_GROUP;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::ApiResource;
use kube::api::DynamicObject;
use kube::api::GroupVersionKind;
use kube::Api;
use kube::Client;

use crate::domain::labels::is_excluded_by_label;
use crate::domain::traits::ExclusionLabels;
use crate::infrastructure::k8s::KubernetesError;

const KUBEVIRT_VERSION: &str = "v1";

/// Reads the backup exclusion label from live cluster objects.
///
/// Objects that no longer exist are reported as not excluded.
#[derive(Clone)]
pub struct KubeExclusionLabels {
    client: Client,
    virtual_machine: ApiResource,
}

impl KubeExclusionLabels {
    pub fn new(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk(KUBEVIRT_GROUP, KUBEVIRT_VERSION, "VirtualMachine");
        Self {
            client,
            virtual_machine: ApiResource::from_gvk(&gvk),
        }
    }
}

#[async_trait]
impl ExclusionLabels for KubeExclusionLabels {
    async fn is_vm_excluded(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, Report<KubernetesError>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.virtual_machine);
        let vm = api
            .get_opt(name)
            .await
            .change_context(KubernetesError::LookupFailed {
                kind: "VirtualMachine",
                namespace: namespace.to_string(),
                message: format!("Failed to get VirtualMachine {name}"),
            })?;

        Ok(vm.is_some_and(|vm| is_excluded_by_label(vm.metadata.labels.as_ref())))
    }

    async fn is_pvc_excluded(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, Report<KubernetesError>> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let pvc = api
            .get_opt(name)
            .await
            .change_context(KubernetesError::LookupFailed {
                kind: "PersistentVolumeClaim",
                namespace: namespace.to_string(),
                message: format!("Failed to get PersistentVolumeClaim {name}"),
            })?;

        Ok(pvc.is_some_and(|pvc| is_excluded_by_label(pvc.metadata.labels.as_ref())))
    }
}
