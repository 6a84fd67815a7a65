//! Version 1 manifest schema

use super::{is_valid_package_name, Manifest, ManifestError, ManifestSchema};
use crate::semver::{Range, Version};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path};

/// A version 1 document as written, before defaults are applied
#[derive(Debug, Clone, Deserialize)]
pub(super) struct ManifestV1 {
    package_name: Option<String>,
    version: Option<String>,
    authors: Option<BTreeMap<String, serde_json::Value>>,
    license: Option<String>,
    description: Option<String>,
    keywords: Option<Vec<String>>,
    links: Option<BTreeMap<String, serde_json::Value>>,
    sources: Option<Vec<String>>,
    contracts: Option<Vec<String>>,
    dependencies: Option<BTreeMap<String, String>>,
}

impl ManifestV1 {
    pub(super) fn from_value(raw: serde_json::Value) -> Result<Self, ManifestError> {
        // Type mismatches are structural problems, not syntax errors
        serde_json::from_value(raw).map_err(|e| ManifestError::Validation(e.to_string()))
    }

    /// Reject documents missing identity fields or carrying malformed values
    pub(super) fn validate(&self) -> Result<(), ManifestError> {
        let name = self
            .package_name
            .as_deref()
            .ok_or_else(|| missing("package_name"))?;
        if !is_valid_package_name(name) {
            return Err(ManifestError::Validation(format!(
                "Invalid package name: '{}'. Must contain only alphanumeric characters, hyphens, and underscores",
                name
            )));
        }

        let version = self.version.as_deref().ok_or_else(|| missing("version"))?;
        Version::parse(version).map_err(|e| {
            ManifestError::Validation(format!("Invalid version '{}': {}", version, e))
        })?;

        for (dep, range) in self.dependencies.iter().flatten() {
            if !is_valid_package_name(dep) {
                return Err(ManifestError::Validation(format!(
                    "Invalid dependency name: '{}'",
                    dep
                )));
            }
            if range.trim().is_empty() {
                return Err(ManifestError::Validation(format!(
                    "Dependency '{}' has empty version range",
                    dep
                )));
            }
            Range::parse(range).map_err(|e| {
                ManifestError::Validation(format!(
                    "Dependency '{}' has invalid version range '{}': {}",
                    dep, range, e
                ))
            })?;
        }

        for source in self.sources.iter().flatten() {
            validate_source(source)?;
        }

        for contract in self.contracts.iter().flatten() {
            if contract.is_empty() {
                return Err(ManifestError::Validation(
                    "Contract names cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Fill defaults for absent optional fields; supplied values pass through untouched
    pub(super) fn normalize(self) -> Manifest {
        Manifest {
            package_name: self.package_name.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            manifest_version: ManifestSchema::V1.version(),
            authors: self.authors.unwrap_or_default(),
            license: self.license.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            keywords: self.keywords.unwrap_or_default(),
            links: self.links.unwrap_or_default(),
            sources: self.sources.unwrap_or_default(),
            contracts: self.contracts.unwrap_or_default(),
            dependencies: self.dependencies.unwrap_or_default(),
        }
    }
}

fn missing(field: &str) -> ManifestError {
    ManifestError::Validation(format!("Missing required field: {}", field))
}

fn validate_source(source: &str) -> Result<(), ManifestError> {
    if source.is_empty() {
        return Err(ManifestError::Validation(
            "Source paths cannot be empty".to_string(),
        ));
    }

    let path = Path::new(source);
    if path.is_absolute() || path.components().any(|c| matches!(c, Component::Prefix(_))) {
        return Err(ManifestError::Validation(format!(
            "Source path '{}' must be relative to the manifest",
            source
        )));
    }

    Ok(())
}
