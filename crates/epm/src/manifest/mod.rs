//! Package manifest parsing (epm.json)
//!
//! A manifest is read as raw JSON, dispatched on its `manifest_version` to a
//! [`ManifestSchema`], validated, and normalized into a [`Manifest`] with every
//! optional field filled in. Installer and publisher only ever see the
//! normalized shape.

mod v1;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Conventional manifest file name
pub const MANIFEST_FILENAME: &str = "epm.json";

/// Errors that can occur during manifest parsing
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read manifest file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Document is not well-formed JSON
    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// Explicit `manifest_version` with no known schema
    #[error("Unknown manifest version {0}")]
    UnknownVersion(u64),

    /// Structurally invalid document
    #[error("Invalid manifest: {0}")]
    Validation(String),
}

/// Known manifest schemas, keyed by `manifest_version`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSchema {
    V1,
}

impl ManifestSchema {
    /// Schema used when `manifest_version` is absent
    pub const DEFAULT: ManifestSchema = ManifestSchema::V1;

    /// Select the schema for an explicit `manifest_version`
    pub fn from_version(version: u64) -> Result<Self, ManifestError> {
        match version {
            1 => Ok(ManifestSchema::V1),
            other => Err(ManifestError::UnknownVersion(other)),
        }
    }

    /// Numeric `manifest_version` of this schema
    pub fn version(self) -> u32 {
        match self {
            ManifestSchema::V1 => 1,
        }
    }

    /// Select the schema for a raw document
    fn detect(raw: &serde_json::Value) -> Result<Self, ManifestError> {
        match raw.get("manifest_version") {
            None | Some(serde_json::Value::Null) => Ok(Self::DEFAULT),
            Some(value) => match value.as_u64() {
                Some(version) => Self::from_version(version),
                None => Err(ManifestError::Validation(format!(
                    "manifest_version must be a non-negative integer, got {}",
                    value
                ))),
            },
        }
    }

    /// Validate and normalize a raw document under this schema
    fn interpret(self, raw: serde_json::Value) -> Result<Manifest, ManifestError> {
        match self {
            ManifestSchema::V1 => {
                let doc = v1::ManifestV1::from_value(raw)?;
                doc.validate()?;
                Ok(doc.normalize())
            }
        }
    }
}

/// Normalized package manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Package name (must be unique in a registry)
    pub package_name: String,

    /// Semver version
    pub version: String,

    /// Schema that interpreted this manifest
    pub manifest_version: u32,

    /// Authors (name -> contact, free-form)
    pub authors: BTreeMap<String, serde_json::Value>,

    /// License identifier
    pub license: String,

    pub description: String,

    pub keywords: Vec<String>,

    /// Named links (homepage, repository, ...)
    pub links: BTreeMap<String, serde_json::Value>,

    /// Files or directories, relative to the manifest's directory
    pub sources: Vec<String>,

    /// Contracts that must ship metadata when published
    pub contracts: Vec<String>,

    /// Dependencies (name -> version range)
    pub dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Read and interpret a manifest file
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_slice(&content)
    }

    /// Interpret a manifest from raw bytes
    pub fn from_slice(content: &[u8]) -> Result<Self, ManifestError> {
        let raw: serde_json::Value = serde_json::from_slice(content)?;
        Self::from_value(raw)
    }

    /// Interpret a manifest from a string
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        Self::from_slice(content.as_bytes())
    }

    /// Interpret an already-parsed JSON document
    pub fn from_value(raw: serde_json::Value) -> Result<Self, ManifestError> {
        if !raw.is_object() {
            return Err(ManifestError::Validation(
                "Manifest must be a JSON object".to_string(),
            ));
        }
        let schema = ManifestSchema::detect(&raw)?;
        schema.interpret(raw)
    }

    /// Schema this manifest was interpreted with
    pub fn schema(&self) -> Result<ManifestSchema, ManifestError> {
        ManifestSchema::from_version(u64::from(self.manifest_version))
    }

    /// Serialize the normalized manifest
    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `name@version` label used in logs and errors
    pub fn id(&self) -> String {
        format!("{}@{}", self.package_name, self.version)
    }
}

/// Validate a package name
///
/// Names become directory names on install, so they are restricted to
/// alphanumerics, hyphens, and underscores.
pub(crate) fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_package_name() {
        assert!(is_valid_package_name("owned"));
        assert!(is_valid_package_name("eth_usd"));
        assert!(is_valid_package_name("safe-math-lib"));
        assert!(is_valid_package_name("token2"));

        assert!(!is_valid_package_name(""));
        assert!(!is_valid_package_name("-leading"));
        assert!(!is_valid_package_name("@org/package"));
        assert!(!is_valid_package_name("a/b"));
        assert!(!is_valid_package_name("my package"));
        assert!(!is_valid_package_name("../evil"));
    }

    #[test]
    fn test_absent_version_uses_default_schema() {
        let manifest =
            Manifest::from_str(r#"{"package_name": "owned", "version": "1.0.0"}"#).unwrap();
        assert_eq!(manifest.manifest_version, 1);
        assert_eq!(manifest.schema().unwrap(), ManifestSchema::V1);
    }

    #[test]
    fn test_null_version_uses_default_schema() {
        let manifest = Manifest::from_str(
            r#"{"package_name": "owned", "version": "1.0.0", "manifest_version": null}"#,
        )
        .unwrap();
        assert_eq!(manifest.manifest_version, 1);
    }

    #[test]
    fn test_unknown_schema_version() {
        let result = Manifest::from_str(
            r#"{"package_name": "owned", "version": "1.0.0", "manifest_version": 7}"#,
        );
        assert!(matches!(result, Err(ManifestError::UnknownVersion(7))));
    }

    #[test]
    fn test_non_integer_schema_version() {
        let result = Manifest::from_str(
            r#"{"package_name": "owned", "version": "1.0.0", "manifest_version": "1"}"#,
        );
        assert!(matches!(result, Err(ManifestError::Validation(_))));
    }

    #[test]
    fn test_non_object_document() {
        assert!(matches!(
            Manifest::from_str("[1, 2, 3]"),
            Err(ManifestError::Validation(_))
        ));
        assert!(matches!(
            Manifest::from_str("{not json"),
            Err(ManifestError::Parse(_))
        ));
    }
}
