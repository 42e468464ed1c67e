//! Velero backup item action for KubeVirt `VirtualMachineInstance` objects.
//!
//! Given a VMI and the resource selection of a backup, the action either
//! rejects the backup with a descriptive error or accepts the VMI and lists
//! the related objects (launcher pod, PVCs, DataVolumes) that must be backed
//! up with it.

pub mod config;
mod domain;
mod infrastructure;

// Re-export main modules
pub use domain::backup_item_action;
pub use domain::labels;
pub use domain::traits;
pub use domain::vmi;
pub use infrastructure::k8s;
pub use infrastructure::kube_client;
pub use infrastructure::logging;
