//! Kubernetes integration module.
//!
//! Cluster-backed implementations of the collaborators consulted by the
//! backup item action:
//! - [`KubePodLister`]: lists pods in a namespace by label selector
//! - [`KubeExclusionLabels`]: reads the backup exclusion label of virtual
//!   machines and persistent volume claims

use core::error::Error;

pub mod exclusion_labels;
pub mod pod_lister;

pub use exclusion_labels::KubeExclusionLabels;
pub use pod_lister::KubePodLister;

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to look up {kind} in namespace {namespace}: {message}")]
    LookupFailed {
        kind: &'static str,
        namespace: String,
        message: String,
    },
}

impl Error for KubernetesError {}
