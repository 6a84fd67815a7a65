//! Lockfile management
//!
//! A lockfile is the immutable record of one published version: every source file
//! pinned to a content URI, plus the manifest URI and opaque contract metadata.
//! It is stored in a content host and referenced only by URI.

use crate::host::ContentUri;
use crate::semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during lockfile operations
#[derive(Debug, Error)]
pub enum LockfileError {
    /// Document is not a lockfile
    #[error("Failed to parse lockfile: {0}")]
    Parse(#[from] serde_json::Error),

    /// Validation error
    #[error("Invalid lockfile: {0}")]
    Validation(String),
}

/// Lockfile
///
/// `sources` and `contracts` are ordered maps, so serialising the same content
/// always produces the same bytes and therefore the same content URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lockfile {
    /// Package version this lockfile pins
    pub version: String,

    /// Manifest schema the package was published with
    pub manifest_version: u32,

    /// URI of the uploaded manifest
    pub package_manifest: ContentUri,

    /// `./relative/path` -> content URI
    #[serde(default)]
    pub sources: BTreeMap<String, ContentUri>,

    /// Contract name -> metadata (opaque)
    #[serde(default)]
    pub contracts: BTreeMap<String, serde_json::Value>,
}

impl Lockfile {
    /// Parse and validate a lockfile
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LockfileError> {
        let lockfile: Lockfile = serde_json::from_slice(bytes)?;
        lockfile.validate()?;
        Ok(lockfile)
    }

    /// Parse and validate a lockfile from a string
    pub fn from_str(content: &str) -> Result<Self, LockfileError> {
        Self::from_slice(content.as_bytes())
    }

    /// Validate the lockfile
    pub fn validate(&self) -> Result<(), LockfileError> {
        Version::parse(&self.version).map_err(|e| {
            LockfileError::Validation(format!("version '{}': {}", self.version, e))
        })?;

        for key in self.sources.keys() {
            validate_source_key(key)?;
        }

        Ok(())
    }

    /// Serialize to JSON bytes
    pub fn to_json(&self) -> Result<Vec<u8>, LockfileError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Check that `key` is a `./`-prefixed path that stays below its base
pub fn validate_source_key(key: &str) -> Result<(), LockfileError> {
    let invalid = |reason: &str| LockfileError::Validation(format!("source path '{}' {}", key, reason));

    let rest = key
        .strip_prefix("./")
        .ok_or_else(|| invalid("must start with './'"))?;

    if rest.is_empty() {
        return Err(invalid("names no file"));
    }
    if rest.contains('\\') {
        return Err(invalid("must use '/' separators"));
    }
    for component in rest.split('/') {
        match component {
            "" => return Err(invalid("has an empty component")),
            "." | ".." => return Err(invalid("must not contain '.' or '..' components")),
            _ => {}
        }
    }

    Ok(())
}

/// Native relative path for a validated source key
pub fn source_key_path(key: &str) -> PathBuf {
    key.trim_start_matches("./").split('/').collect()
}
