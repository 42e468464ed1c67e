//! Loading of the manifests handed to the `evaluate` command.

use core::error::Error;
use std::io::Read;
use std::path::Path;

use backup_types::Backup;
use backup_types::BackupSpec;
use error_stack::Report;
use error_stack::ResultExt;
use serde_json::Value;

#[derive(Debug, derive_more::Display)]
pub enum ManifestError {
    #[display("Failed to read manifest {path}")]
    ReadFailed { path: String },
    #[display("Failed to parse manifest {path}")]
    ParseFailed { path: String },
}

impl Error for ManifestError {}

fn read_to_string(path: &Path) -> Result<String, Report<ManifestError>> {
    let context = || ManifestError::ReadFailed {
        path: path.display().to_string(),
    };

    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .change_context_lazy(context)?;
        return Ok(content);
    }
    std::fs::read_to_string(path).change_context_lazy(context)
}

/// Parse an unstructured object from YAML or JSON text.
pub fn parse_item(content: &str) -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Parse a backup configuration from either a whole `Backup` manifest or a
/// bare spec with `includedResources` / `excludedResources` at the top level.
pub fn parse_backup_spec(content: &str) -> Result<BackupSpec, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(BackupSpec::default());
    }

    let value: Value = serde_yaml::from_str(content)?;
    if value.is_null() {
        return Ok(BackupSpec::default());
    }
    if value.get("spec").is_some() {
        let backup: Backup = serde_json::from_value(value).map_err(json_error)?;
        return Ok(backup.spec);
    }
    serde_json::from_value(value).map_err(json_error)
}

fn json_error(e: serde_json::Error) -> serde_yaml::Error {
    serde::de::Error::custom(e)
}

/// Load the backup item given on the command line.
pub fn load_item(path: &Path) -> Result<Value, Report<ManifestError>> {
    let content = read_to_string(path)?;
    parse_item(&content).change_context(ManifestError::ParseFailed {
        path: path.display().to_string(),
    })
}

/// Load the backup configuration, defaulting to "include everything".
pub fn load_backup_spec(path: Option<&Path>) -> Result<BackupSpec, Report<ManifestError>> {
    let Some(path) = path else {
        return Ok(BackupSpec::default());
    };
    let content = read_to_string(path)?;
    parse_backup_spec(&content).change_context(ManifestError::ParseFailed {
        path: path.display().to_string(),
    })
}
