//! EPM package manager library
//!
//! This crate provides package management for content-addressed source packages:
//! - Package manifest parsing (epm.json) with versioned schemas
//! - Semver version parsing and range matching
//! - Content-addressed storage (content hosts)
//! - Version registries with atomic registration
//! - Source expansion and lockfile construction
//! - Publishing packages and installing dependency trees

pub mod config;
pub mod host;
pub mod install;
pub mod lockfile;
pub mod logging;
pub mod manifest;
pub mod publish;
pub mod registry;
pub mod semver;
pub mod sources;

pub use config::{ConfigError, EpmConfig, Settings};
pub use host::{ContentHost, ContentUri, HostError, HostRouter, LocalStore, MemoryHost};
pub use install::{InstallError, InstallReport, InstalledPackage, Installer};
pub use lockfile::{Lockfile, LockfileError};
pub use manifest::{Manifest, ManifestError, ManifestSchema, MANIFEST_FILENAME};
pub use publish::{PublishError, PublishReceipt, Publisher};
pub use registry::{
    DirectoryRegistry, MemoryRegistry, Registry, RegistryBackend, RegistryError, ResolvedEntry,
};
pub use semver::{Constraint, Range, SemverError, Version};
pub use sources::SourceError;
