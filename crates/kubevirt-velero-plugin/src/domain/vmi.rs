use core::error::Error;
use std::collections::BTreeMap;

use error_stack::Report;
use error_stack::ResultExt;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::labels::OWNED_ANNOTATION;

/// Errors raised while decoding an unstructured VirtualMachineInstance.
#[derive(Debug, derive_more::Display)]
pub enum DecodeError {
    #[display("Invalid VirtualMachineInstance object: {message}")]
    InvalidObject { message: String },
    #[display("VirtualMachineInstance is missing {field}")]
    MissingField { field: &'static str },
}

impl Error for DecodeError {}

/// Reference from a VMI to the object owning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
}

/// Where the data of a VMI volume lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VolumeSource {
    PersistentVolumeClaim { claim_name: String },
    DataVolume { name: String },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

/// The parts of a `VirtualMachineInstance` the backup decision looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct VirtualMachineInstance {
    pub namespace: String,
    pub name: String,
    pub annotations: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
    pub paused: bool,
    pub volumes: Vec<Volume>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawObject {
    metadata: Option<RawMetadata>,
    spec: Option<RawSpec>,
    status: Option<RawStatus>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawMetadata {
    name: Option<String>,
    namespace: Option<String>,
    annotations: Option<BTreeMap<String, String>>,
    owner_references: Option<Vec<OwnerReference>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSpec {
    volumes: Option<Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawStatus {
    conditions: Option<Vec<RawCondition>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawCondition {
    #[serde(rename = "type")]
    type_: String,
    status: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawVolume {
    name: String,
    persistent_volume_claim: Option<RawClaimSource>,
    data_volume: Option<RawDataVolumeSource>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawClaimSource {
    claim_name: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawDataVolumeSource {
    name: String,
}

impl From<RawVolume> for Volume {
    fn from(raw: RawVolume) -> Self {
        let source = match (raw.persistent_volume_claim, raw.data_volume) {
            (Some(claim), _) => VolumeSource::PersistentVolumeClaim {
                claim_name: claim.claim_name,
            },
            (None, Some(data_volume)) => VolumeSource::DataVolume {
                name: data_volume.name,
            },
            (None, None) => VolumeSource::Other,
        };
        Self {
            name: raw.name,
            source,
        }
    }
}

impl VirtualMachineInstance {
    /// Decode a VMI from its unstructured (apiVersion/kind/metadata/spec/status) form.
    ///
    /// Volume entries that cannot be decoded are skipped.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::InvalidObject`] if the object does not have the VMI shape
    /// - [`DecodeError::MissingField`] if name or namespace is absent
    pub fn from_unstructured(object: &Value) -> Result<Self, Report<DecodeError>> {
        if !object.is_object() {
            return Err(Report::new(DecodeError::InvalidObject {
                message: "expected a JSON object".to_string(),
            }));
        }

        let raw = RawObject::deserialize(object).change_context(DecodeError::InvalidObject {
            message: "unexpected field types".to_string(),
        })?;

        let metadata = raw.metadata.unwrap_or_default();
        let name = metadata
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Report::new(DecodeError::MissingField {
                    field: "metadata.name",
                })
            })?;
        let namespace = metadata
            .namespace
            .filter(|namespace| !namespace.is_empty())
            .ok_or_else(|| {
                Report::new(DecodeError::MissingField {
                    field: "metadata.namespace",
                })
            })?;

        let volumes = match raw.spec.and_then(|spec| spec.volumes) {
            Some(Value::Array(volumes)) => volumes,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                debug!("Skipping spec.volumes, expected a list: {other}");
                Vec::new()
            }
        };
        let volumes = volumes
            .into_iter()
            .enumerate()
            .filter_map(|(index, volume)| match RawVolume::deserialize(&volume) {
                Ok(raw) => Some(Volume::from(raw)),
                Err(e) => {
                    debug!(index, "Skipping malformed volume: {e}");
                    None
                }
            })
            .collect();

        let paused = raw
            .status
            .and_then(|status| status.conditions)
            .unwrap_or_default()
            .iter()
            .any(|c| c.type_ == "Paused" && c.status.eq_ignore_ascii_case("true"));

        Ok(Self {
            namespace,
            name,
            annotations: metadata.annotations.unwrap_or_default(),
            owner_references: metadata.owner_references.unwrap_or_default(),
            paused,
            volumes,
        })
    }

    /// Copy this descriptor's annotations into the unstructured object it was decoded from.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::InvalidObject`] if `metadata` or `metadata.annotations` is not a map
    pub fn write_annotations(&self, object: &mut Value) -> Result<(), Report<DecodeError>> {
        if self.annotations.is_empty() {
            return Ok(());
        }

        let invalid = |what: &str| {
            Report::new(DecodeError::InvalidObject {
                message: format!("{what} is not a map"),
            })
        };

        let root = object.as_object_mut().ok_or_else(|| invalid("object"))?;
        let metadata = root
            .entry("metadata")
            .or_insert_with(|| Value::Object(Default::default()))
            .as_object_mut()
            .ok_or_else(|| invalid("metadata"))?;
        let annotations = metadata
            .entry("annotations")
            .or_insert_with(|| Value::Object(Default::default()));
        if annotations.is_null() {
            *annotations = Value::Object(Default::default());
        }
        let annotations = annotations
            .as_object_mut()
            .ok_or_else(|| invalid("metadata.annotations"))?;

        for (key, value) in &self.annotations {
            annotations.insert(key.clone(), Value::String(value.clone()));
        }
        Ok(())
    }

    /// The owning object, normally a `VirtualMachine`.
    pub fn owner(&self) -> Option<&OwnerReference> {
        self.owner_references.first()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn mark_owned(&mut self) {
        self.annotations
            .insert(OWNED_ANNOTATION.to_string(), "true".to_string());
    }

    pub fn is_marked_owned(&self) -> bool {
        self.annotations
            .get(OWNED_ANNOTATION)
            .is_some_and(|value| value == "true")
    }

    /// Whether any volume is backed by a PVC or a DataVolume.
    pub fn has_claim_backed_volumes(&self) -> bool {
        self.volumes
            .iter()
            .any(|volume| !matches!(volume.source, VolumeSource::Other))
    }

    /// Non-empty claim names of PVC-backed volumes, in volume order.
    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.volumes.iter().filter_map(|volume| match &volume.source {
            VolumeSource::PersistentVolumeClaim { claim_name } if !claim_name.is_empty() => {
                Some(claim_name.as_str())
            }
            _ => None,
        })
    }

    /// Non-empty names of DataVolume-backed volumes, in volume order.
    pub fn data_volume_names(&self) -> impl Iterator<Item = &str> {
        self.volumes.iter().filter_map(|volume| match &volume.source {
            VolumeSource::DataVolume { name } if !name.is_empty() => Some(name.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    fn vmi_object(spec: Value, status: Value) -> Value {
        json!({
            "apiVersion": "kubevirt.io/v1",
            "kind": "VirtualMachineInstance",
            "metadata": {
                "name": "test-vmi",
                "namespace": "test-namespace",
                "ownerReferences": [{ "name": "test-owner" }],
            },
            "spec": spec,
            "status": status,
        })
    }

    #[test]
    fn decodes_metadata_and_owner() {
        let vmi = VirtualMachineInstance::from_unstructured(&vmi_object(json!({}), json!({})))
            .unwrap();

        assert_eq!(vmi.name, "test-vmi");
        assert_eq!(vmi.namespace, "test-namespace");
        assert_eq!(vmi.owner().map(|o| o.name.as_str()), Some("test-owner"));
        assert!(!vmi.is_paused());
        assert!(vmi.volumes.is_empty());
    }

    #[test]
    fn decodes_volume_sources() {
        let object = vmi_object(
            json!({
                "volumes": [
                    { "name": "root", "persistentVolumeClaim": { "claimName": "test-pvc" } },
                    { "name": "data", "dataVolume": { "name": "test-dv" } },
                    { "name": "init", "cloudInitNoCloud": { "userData": "#cloud-config" } },
                    "not-a-volume",
                    { "dataVolume": {} },
                ]
            }),
            json!({}),
        );
        let vmi = VirtualMachineInstance::from_unstructured(&object).unwrap();

        assert_eq!(
            vmi.volumes,
            vec![
                Volume {
                    name: "root".to_string(),
                    source: VolumeSource::PersistentVolumeClaim {
                        claim_name: "test-pvc".to_string()
                    },
                },
                Volume {
                    name: "data".to_string(),
                    source: VolumeSource::DataVolume {
                        name: "test-dv".to_string()
                    },
                },
                Volume {
                    name: "init".to_string(),
                    source: VolumeSource::Other,
                },
                Volume {
                    name: String::new(),
                    source: VolumeSource::DataVolume {
                        name: String::new()
                    },
                },
            ]
        );
        assert!(vmi.has_claim_backed_volumes());
        assert_eq!(vmi.claim_names().collect::<Vec<_>>(), vec!["test-pvc"]);
        assert_eq!(vmi.data_volume_names().collect::<Vec<_>>(), vec!["test-dv"]);
    }

    #[test]
    fn volumes_that_are_not_a_list_are_skipped() {
        for volumes in [json!({ "name": "root" }), json!("root"), Value::Null] {
            let object = vmi_object(json!({ "volumes": volumes }), json!({}));
            let vmi = VirtualMachineInstance::from_unstructured(&object).unwrap();
            assert!(vmi.volumes.is_empty());
            assert!(!vmi.has_claim_backed_volumes());
        }
    }

    #[test]
    fn only_other_volumes_are_not_claim_backed() {
        let object = vmi_object(
            json!({ "volumes": [{ "name": "disk", "containerDisk": { "image": "fedora" } }] }),
            json!({}),
        );
        let vmi = VirtualMachineInstance::from_unstructured(&object).unwrap();
        assert!(!vmi.has_claim_backed_volumes());
    }

    #[test]
    fn paused_condition() {
        let paused = vmi_object(
            json!({}),
            json!({ "conditions": [
                { "type": "Ready", "status": "True" },
                { "type": "Paused", "status": "True" },
            ] }),
        );
        assert!(VirtualMachineInstance::from_unstructured(&paused)
            .unwrap()
            .is_paused());

        let unpaused = vmi_object(
            json!({}),
            json!({ "conditions": [{ "type": "Paused", "status": "False" }] }),
        );
        assert!(!VirtualMachineInstance::from_unstructured(&unpaused)
            .unwrap()
            .is_paused());
    }

    #[test]
    fn missing_name_is_rejected() {
        let object = json!({ "metadata": { "namespace": "test-namespace" } });
        let report = VirtualMachineInstance::from_unstructured(&object).unwrap_err();
        assert!(matches!(
            report.current_context(),
            DecodeError::MissingField {
                field: "metadata.name"
            }
        ));
    }

    #[test]
    fn non_object_is_rejected() {
        let report = VirtualMachineInstance::from_unstructured(&json!([1, 2])).unwrap_err();
        assert!(matches!(
            report.current_context(),
            DecodeError::InvalidObject { .. }
        ));
    }

    #[test]
    fn write_annotations_keeps_existing_entries() {
        let mut object = vmi_object(json!({}), json!({}));
        object["metadata"]["annotations"] = json!({ "team": "storage" });

        let mut vmi = VirtualMachineInstance::from_unstructured(&object).unwrap();
        vmi.mark_owned();
        vmi.write_annotations(&mut object).unwrap();

        assert_eq!(
            object["metadata"]["annotations"],
            json!({ "team": "storage", "cdi.kubevirt.io/velero.isOwned": "true" })
        );
    }

    #[test]
    fn write_annotations_without_annotations_leaves_object_alone() {
        let mut object = vmi_object(json!({}), json!({}));
        let original = object.clone();

        let vmi = VirtualMachineInstance::from_unstructured(&object).unwrap();
        vmi.write_annotations(&mut object).unwrap();

        assert_eq!(object, original);
    }
}
