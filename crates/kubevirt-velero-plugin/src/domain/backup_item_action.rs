//! Backup item action for `VirtualMachineInstance` objects.
//!
//! Decides whether a VMI can be backed up with the current backup
//! configuration, and which related objects (launcher pod, PVCs, DataVolumes)
//! have to be captured alongside it.

use core::error::Error;

use backup_types::BackupSpec;
use backup_types::GroupResource;
use backup_types::ResourceIdentifier;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::domain::labels::is_excluded_by_label;
use crate::domain::labels::launcher_label_selector;
use crate::domain::labels::DOMAIN_ANNOTATION;
use crate::domain::traits::ExclusionLabels;
use crate::domain::traits::PodLister;
use crate::domain::vmi::VirtualMachineInstance;
use crate::infrastructure::k8s::KubernetesError;

/// Why a VMI backup item was rejected or could not be evaluated.
///
/// The messages of the three validation variants are matched by callers and
/// must stay verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum BackupItemError {
    #[display("VMI owned by a VM and the VM is not included in the backup")]
    VmNotIncluded,
    #[display("VM is running but launcher pod is not included in the backup")]
    LauncherPodNotIncluded,
    #[display(
        "VM has DataVolume or PVC volumes and DataVolumes/PVCs is not included in the backup"
    )]
    VolumesNotIncluded,
    #[display("Failed to decode backup item")]
    Decode,
    #[display("Failed to look up related cluster resources")]
    Lookup,
}

impl BackupItemError {
    /// Validation failures are fixed by adjusting the backup configuration;
    /// everything else is a collaborator failure.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::VmNotIncluded | Self::LauncherPodNotIncluded | Self::VolumesNotIncluded
        )
    }
}

impl Error for BackupItemError {}

/// Tunables of the backup item action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionConfig {
    /// Reject running VMIs whose PVC volumes carry the backup exclusion label
    pub honor_pvc_exclusion_labels: bool,
}

/// Result of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupItemOutput<T> {
    /// The backup item, annotated when owned by a VM
    pub item: T,
    /// Related objects to add to the backup, launcher pod first
    pub additional_items: Vec<ResourceIdentifier>,
}

/// Backup item action deciding what a VirtualMachineInstance backup must carry along.
pub struct VmiBackupItemAction<P, L> {
    pods: P,
    labels: L,
    config: ActionConfig,
}

impl<P, L> VmiBackupItemAction<P, L>
where
    P: PodLister,
    L: ExclusionLabels,
{
    pub fn new(pods: P, labels: L, config: ActionConfig) -> Self {
        Self {
            pods,
            labels,
            config,
        }
    }

    /// Evaluate one VMI against a backup configuration.
    ///
    /// Checks run in a fixed order and the first violation is returned:
    /// owning VM inclusion, launcher pod inclusion, then volume backing
    /// resources. The pod and volume checks are skipped for paused VMIs.
    ///
    /// # Errors
    ///
    /// - [`BackupItemError::VmNotIncluded`] if the owning VM is left out of the backup
    /// - [`BackupItemError::LauncherPodNotIncluded`] if a running VMI's launcher pod is left out
    /// - [`BackupItemError::VolumesNotIncluded`] if PVC or DataVolume types are left out
    /// - [`BackupItemError::Lookup`] if a cluster lookup fails
    #[tracing::instrument(skip_all, fields(namespace = %vmi.namespace, name = %vmi.name))]
    pub async fn execute(
        &self,
        mut vmi: VirtualMachineInstance,
        backup: &BackupSpec,
    ) -> Result<BackupItemOutput<VirtualMachineInstance>, Report<BackupItemError>> {
        debug!("Executing VMI backup item action");

        let owner_excluded_by_label = match vmi.owner() {
            Some(owner) => self
                .labels
                .is_vm_excluded(&vmi.namespace, &owner.name)
                .await
                .change_context(BackupItemError::Lookup)?,
            None => false,
        };

        let running = !vmi.is_paused();
        if !running {
            debug!("VMI is paused, skipping launcher pod and volume checks");
        }

        if let Some(owner) = vmi.owner() {
            if owner_excluded_by_label
                || !backup.is_resource_included(&GroupResource::virtual_machines())
            {
                return Err(Report::new(BackupItemError::VmNotIncluded)
                    .attach_printable(format!("owner: {}", owner.name)));
            }
            vmi.mark_owned();
        }

        let launcher_pod = self
            .find_launcher_pod(&vmi.namespace, &vmi.name)
            .await
            .change_context(BackupItemError::Lookup)?;

        if running {
            if let Some(pod) = &launcher_pod {
                self.check_launcher_pod(pod, backup)?;
            }
            if vmi.has_claim_backed_volumes() {
                self.check_volumes(&vmi, backup).await?;
            }
        }

        let mut additional_items = Vec::new();
        if let Some(pod_name) = launcher_pod.and_then(|pod| pod.metadata.name) {
            additional_items.push(ResourceIdentifier::new(
                GroupResource::pods(),
                &vmi.namespace,
                pod_name,
            ));
        }
        additional_items.extend(vmi.claim_names().map(|claim| {
            ResourceIdentifier::new(
                GroupResource::persistent_volume_claims(),
                &vmi.namespace,
                claim,
            )
        }));
        additional_items.extend(vmi.data_volume_names().map(|name| {
            ResourceIdentifier::new(GroupResource::data_volumes(), &vmi.namespace, name)
        }));

        info!(
            additional_items = additional_items.len(),
            owned = vmi.is_marked_owned(),
            "VMI accepted for backup"
        );

        Ok(BackupItemOutput {
            item: vmi,
            additional_items,
        })
    }

    /// Evaluate an unstructured VMI object.
    ///
    /// The owned annotation, when added, is written back into `item`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`], plus [`BackupItemError::Decode`] if `item`
    /// is not a VirtualMachineInstance.
    pub async fn execute_unstructured(
        &self,
        mut item: Value,
        backup: &BackupSpec,
    ) -> Result<BackupItemOutput<Value>, Report<BackupItemError>> {
        let vmi = VirtualMachineInstance::from_unstructured(&item)
            .change_context(BackupItemError::Decode)?;

        let output = self.execute(vmi, backup).await?;
        output
            .item
            .write_annotations(&mut item)
            .change_context(BackupItemError::Decode)?;

        Ok(BackupItemOutput {
            item,
            additional_items: output.additional_items,
        })
    }

    /// Find the virt-launcher pod running the named VMI.
    ///
    /// Returns `None` when no launcher pod in the namespace names the VMI in
    /// its domain annotation. The first match wins.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::LookupFailed`] if the pods cannot be listed
    pub async fn find_launcher_pod(
        &self,
        namespace: &str,
        vmi_name: &str,
    ) -> Result<Option<Pod>, Report<KubernetesError>> {
        let pods = self
            .pods
            .list_pods(namespace, &launcher_label_selector())
            .await?;

        let pod = pods.into_iter().find(|pod| {
            pod.metadata
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(DOMAIN_ANNOTATION))
                .is_some_and(|domain| domain == vmi_name)
        });

        match &pod {
            Some(pod) => debug!(pod = ?pod.metadata.name, "Found launcher pod"),
            None => debug!("No launcher pod found"),
        }
        Ok(pod)
    }

    fn check_launcher_pod(
        &self,
        pod: &Pod,
        backup: &BackupSpec,
    ) -> Result<(), Report<BackupItemError>> {
        if !backup.is_resource_included(&GroupResource::pods()) {
            return Err(Report::new(BackupItemError::LauncherPodNotIncluded)
                .attach_printable("pods are not included in the backup"));
        }
        if is_excluded_by_label(pod.metadata.labels.as_ref()) {
            return Err(Report::new(BackupItemError::LauncherPodNotIncluded)
                .attach_printable(format!("launcher pod {:?} is excluded by label", pod.metadata.name)));
        }
        Ok(())
    }

    async fn check_volumes(
        &self,
        vmi: &VirtualMachineInstance,
        backup: &BackupSpec,
    ) -> Result<(), Report<BackupItemError>> {
        for resource in [
            GroupResource::persistent_volume_claims(),
            GroupResource::data_volumes(),
        ] {
            if !backup.is_resource_included(&resource) {
                return Err(Report::new(BackupItemError::VolumesNotIncluded)
                    .attach_printable(format!("{resource} are not included in the backup")));
            }
        }

        if self.config.honor_pvc_exclusion_labels {
            for claim in vmi.claim_names() {
                let excluded = self
                    .labels
                    .is_pvc_excluded(&vmi.namespace, claim)
                    .await
                    .change_context(BackupItemError::Lookup)?;
                if excluded {
                    return Err(Report::new(BackupItemError::VolumesNotIncluded)
                        .attach_printable(format!("PVC {claim} is excluded by label")));
                }
            }
        }
        Ok(())
    }
}
