//! Package registry
//!
//! The registry maps `(package, version)` to the URI of that version's lockfile.
//! Storage is pluggable through [`RegistryBackend`], whose only concurrency
//! contract is an atomic insert-if-absent; version resolution lives in
//! [`Registry`] and is shared by every backend.

mod directory;
mod memory;

pub use directory::DirectoryRegistry;
pub use memory::MemoryRegistry;

use crate::host::ContentUri;
use crate::semver::{Range, SemverError, Version};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No registered version satisfies the range (or the package is unknown)
    #[error("No version of {package} satisfies {range}")]
    NoSatisfyingVersion { package: String, range: String },

    /// The version is already registered
    #[error("Version {version} already exists for package {package}")]
    DuplicateVersion { package: String, version: String },

    /// Version range could not be parsed
    #[error("Invalid version range '{range}' for {package}: {source}")]
    InvalidRange {
        package: String,
        range: String,
        #[source]
        source: SemverError,
    },

    /// Version could not be parsed
    #[error("Invalid version '{version}' for {package}: {source}")]
    InvalidVersion {
        package: String,
        version: String,
        #[source]
        source: SemverError,
    },

    /// Package name unusable as a registry key
    #[error("Invalid package name: {0}")]
    InvalidName(String),

    /// Backend storage failure
    #[error("Registry storage error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend holds an entry that is not a content URI
    #[error("Corrupt registry entry for {package}@{version}: {reason}")]
    Corrupt {
        package: String,
        version: String,
        reason: String,
    },
}

/// Storage behind a [`Registry`]
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Every version string registered for `name` (empty if unknown)
    async fn versions(&self, name: &str) -> Result<Vec<String>, RegistryError>;

    /// Lockfile URI registered for an exact version
    async fn lookup(&self, name: &str, version: &str) -> Result<Option<ContentUri>, RegistryError>;

    /// Store an entry unless one exists; returns `false` if the slot was taken.
    ///
    /// Must be atomic: of several concurrent calls for the same slot exactly one
    /// returns `true`.
    async fn insert_if_absent(
        &self,
        name: &str,
        version: &str,
        uri: &ContentUri,
    ) -> Result<bool, RegistryError>;
}

/// A version resolved from a range, with its lockfile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub version: Version,
    pub lockfile_uri: ContentUri,
}

/// Version resolution and registration over a backend
#[derive(Clone)]
pub struct Registry {
    backend: Arc<dyn RegistryBackend>,
}

impl Registry {
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self { backend }
    }

    /// A registry over a fresh [`MemoryRegistry`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRegistry::new()))
    }

    /// Highest registered version of `name` satisfying `range`
    pub async fn resolve_version(
        &self,
        name: &str,
        range: &str,
    ) -> Result<Option<Version>, RegistryError> {
        Ok(self.select(name, range).await?.map(|(version, _)| version))
    }

    /// Resolve `range` and return the version together with its lockfile URI
    pub async fn resolve(&self, name: &str, range: &str) -> Result<ResolvedEntry, RegistryError> {
        let no_match = || RegistryError::NoSatisfyingVersion {
            package: name.to_string(),
            range: range.to_string(),
        };

        let (version, key) = self.select(name, range).await?.ok_or_else(no_match)?;
        let lockfile_uri = self.backend.lookup(name, &key).await?.ok_or_else(no_match)?;

        Ok(ResolvedEntry {
            version,
            lockfile_uri,
        })
    }

    /// Pick the highest satisfying version, keeping the backend's spelling of it
    async fn select(
        &self,
        name: &str,
        range: &str,
    ) -> Result<Option<(Version, String)>, RegistryError> {
        let range_expr = Range::parse(range).map_err(|source| RegistryError::InvalidRange {
            package: name.to_string(),
            range: range.to_string(),
            source,
        })?;

        // Entries that do not parse cannot satisfy any range
        let known: Vec<(Version, String)> = self
            .backend
            .versions(name)
            .await?
            .into_iter()
            .filter_map(|raw| Version::parse(&raw).ok().map(|v| (v, raw)))
            .collect();

        let selected = range_expr
            .max_satisfying(known.iter().map(|(version, _)| version))
            .and_then(|best| known.iter().find(|(version, _)| version == best))
            .cloned();

        debug!(
            package = name,
            range,
            candidates = known.len(),
            selected = ?selected.as_ref().map(|(_, raw)| raw),
            "resolved version"
        );
        Ok(selected)
    }

    /// Lockfile URI of the highest version satisfying `range`
    pub async fn get_lockfile_uri(&self, name: &str, range: &str) -> Result<ContentUri, RegistryError> {
        Ok(self.resolve(name, range).await?.lockfile_uri)
    }

    /// Register a version; fails if that version is already registered
    pub async fn register(
        &self,
        name: &str,
        version: &str,
        lockfile_uri: &ContentUri,
    ) -> Result<(), RegistryError> {
        if !crate::manifest::is_valid_package_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        let mut parsed = Version::parse(version).map_err(|source| RegistryError::InvalidVersion {
            package: name.to_string(),
            version: version.to_string(),
            source,
        })?;

        // One slot per precedence: "v1.0.0", "1.0.0" and "1.0.0+build.7" collide
        parsed.build = None;
        let canonical = parsed.to_string();

        if !self
            .backend
            .insert_if_absent(name, &canonical, lockfile_uri)
            .await?
        {
            return Err(RegistryError::DuplicateVersion {
                package: name.to_string(),
                version: canonical,
            });
        }

        info!(package = name, version = %canonical, lockfile = %lockfile_uri, "registered");
        Ok(())
    }

    /// Every registered version of `name`, ascending
    pub async fn versions(&self, name: &str) -> Result<Vec<Version>, RegistryError> {
        let mut versions: Vec<Version> = self
            .backend
            .versions(name)
            .await?
            .iter()
            .filter_map(|v| Version::parse(v).ok())
            .collect();
        versions.sort();
        Ok(versions)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}
