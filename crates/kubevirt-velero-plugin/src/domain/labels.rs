use std::collections::BTreeMap;

/// Velero label that removes an object from every backup.
pub const EXCLUDE_FROM_BACKUP_LABEL: &str = "velero.io/exclude-from-backup";

/// Label (and value) carried by every virt-launcher pod.
pub const LAUNCHER_LABEL_KEY: &str = "kubevirt.io";
pub const LAUNCHER_LABEL_VALUE: &str = "virt-launcher";

/// Annotation on a virt-launcher pod naming the VMI it runs.
pub const DOMAIN_ANNOTATION: &str = "kubevirt.io/domain";

/// Annotation marking a backed up VMI as owned by a VirtualMachine.
pub const OWNED_ANNOTATION: &str = "cdi.kubevirt.io/velero.isOwned";

/// Label selector matching virt-launcher pods.
pub fn launcher_label_selector() -> String {
    format!("{LAUNCHER_LABEL_KEY}={LAUNCHER_LABEL_VALUE}")
}

/// Check whether a label set opts the object out of backups.
pub fn is_excluded_by_label(labels: Option<&BTreeMap<String, String>>) -> bool {
    labels
        .and_then(|labels| labels.get(EXCLUDE_FROM_BACKUP_LABEL))
        .is_some_and(|value| value == "true")
}
