//! Shared backup API type definitions
//!
//! This crate contains the backup-facing types exchanged between the
//! KubeVirt backup item action and its callers: group resources, resource
//! identifiers for additional items, and the resource selection part of a
//! Velero `Backup` object.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Group of the KubeVirt core API (`VirtualMachine`, `VirtualMachineInstance`).
pub const KUBEVIRT_GROUP: &str = "kubevirt.io";

/// Group of the Containerized Data Importer API (`DataVolume`).
pub const CDI_GROUP: &str = "cdi.kubevirt.io";

/// Wildcard entry matching every resource in an include/exclude list.
const WILDCARD: &str = "*";

/// A Kubernetes resource type qualified by its API group.
///
/// Core resources use an empty group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct GroupResource {
    #[serde(default)]
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }

    pub fn pods() -> Self {
        Self::new("", "pods")
    }

    pub fn persistent_volume_claims() -> Self {
        Self::new("", "persistentvolumeclaims")
    }

    pub fn data_volumes() -> Self {
        Self::new(CDI_GROUP, "datavolumes")
    }

    pub fn virtual_machines() -> Self {
        Self::new(KUBEVIRT_GROUP, "virtualmachines")
    }

    pub fn virtual_machine_instances() -> Self {
        Self::new(KUBEVIRT_GROUP, "virtualmachineinstances")
    }

    /// Check whether an include/exclude list entry selects this resource.
    ///
    /// Accepts the bare resource name (`datavolumes`), the group-qualified
    /// form (`datavolumes.cdi.kubevirt.io`) and the `*` wildcard.
    pub fn matches(&self, entry: &str) -> bool {
        let entry = entry.trim();
        if entry == WILDCARD || entry.eq_ignore_ascii_case(&self.resource) {
            return true;
        }

        match entry.split_once('.') {
            Some((resource, group)) if !self.group.is_empty() => {
                resource.eq_ignore_ascii_case(&self.resource)
                    && group.eq_ignore_ascii_case(&self.group)
            }
            _ => false,
        }
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// Identifies one additional object that must be captured with a backup item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentifier {
    pub group_resource: GroupResource,
    pub namespace: String,
    pub name: String,
}

impl ResourceIdentifier {
    pub fn new(
        group_resource: GroupResource,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group_resource,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.group_resource, self.namespace, self.name)
    }
}

/// Resource selection of a Velero backup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// When non-empty, only the listed resource types are part of the backup.
    #[serde(default)]
    pub included_resources: Vec<String>,
    /// Resource types left out of the backup. Ignored while
    /// `included_resources` is non-empty and has no `*` entry.
    #[serde(default)]
    pub excluded_resources: Vec<String>,
}

impl BackupSpec {
    /// Decide whether a resource type is part of this backup.
    ///
    /// A non-empty include list wins over the exclude list; with both lists
    /// empty every resource type is included. An include list holding `*`
    /// selects everything, so the exclude list still applies to it.
    pub fn is_resource_included(&self, resource: &GroupResource) -> bool {
        if !self.includes_everything() {
            return self
                .included_resources
                .iter()
                .any(|entry| resource.matches(entry));
        }

        !self
            .excluded_resources
            .iter()
            .any(|entry| resource.matches(entry))
    }

    fn includes_everything(&self) -> bool {
        self.included_resources.is_empty()
            || self
                .included_resources
                .iter()
                .any(|entry| entry.trim() == WILDCARD)
    }
}

/// A Velero `Backup` manifest, reduced to the fields this crate reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub spec: BackupSpec,
}
