//! Dependency installation
//!
//! An install run has three phases:
//!
//! 1. **Resolve**: walk the dependency graph breadth-first. Each level's edges are
//!    resolved against the registry concurrently, then the lockfile and manifest
//!    of every newly seen `name@version` are fetched concurrently.
//! 2. **Cycle check**: depth-first search over the resolved graph.
//! 3. **Materialize**: every package is written into
//!    `<destination>/.<name>-<version>.partial` and renamed to
//!    `<destination>/<name>-<version>` once all of its files are in place.
//!
//! Every fan-out is a `try_join_all`, so the first failure wins and the
//! remaining futures of that stage are dropped.

use crate::host::{ContentHost, ContentUri, HostError};
use crate::lockfile::{source_key_path, Lockfile, LockfileError};
use crate::manifest::{Manifest, ManifestError, MANIFEST_FILENAME};
use crate::registry::{Registry, RegistryError};
use crate::semver::Version;
use futures::future::try_join_all;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// Errors that can occur during installation
#[derive(Debug, Error)]
pub enum InstallError {
    /// Resolution failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Content host could not serve a file
    #[error("Failed to fetch {item} of {package}: {source}")]
    Fetch {
        package: String,
        item: String,
        #[source]
        source: HostError,
    },

    /// Published lockfile is unusable
    #[error("Invalid lockfile for {package}: {source}")]
    Lockfile {
        package: String,
        #[source]
        source: LockfileError,
    },

    /// Published manifest is unusable
    #[error("Invalid manifest for {package}: {source}")]
    Manifest {
        package: String,
        #[source]
        source: ManifestError,
    },

    /// Published content disagrees with the registry entry
    #[error("Registry entry {package} points at {found}")]
    Mismatch { package: String, found: String },

    /// Dependency graph is not acyclic
    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    /// Writing to the destination failed
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> InstallError + '_ {
    move |source| InstallError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A package that is part of the install result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: Version,
    pub path: PathBuf,
}

/// Outcome of an install run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Packages written by this run
    pub installed: Vec<InstalledPackage>,

    /// Packages whose directory already existed
    pub skipped: Vec<InstalledPackage>,
}

impl InstallReport {
    /// Every package in the dependency closure
    pub fn packages(&self) -> impl Iterator<Item = &InstalledPackage> {
        self.installed.iter().chain(self.skipped.iter())
    }
}

/// A dependency resolved to an exact version with its published documents
#[derive(Debug)]
struct ResolvedPackage {
    name: String,
    version: Version,
    lockfile: Lockfile,
    manifest_bytes: Vec<u8>,
    dependencies: BTreeMap<String, String>,
}

impl ResolvedPackage {
    fn id(&self) -> String {
        package_id(&self.name, &self.version)
    }

    fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

fn package_id(name: &str, version: &Version) -> String {
    format!("{}@{}", name, version)
}

/// Graph key of the manifest being installed, spelled the way the registry spells versions
fn root_id(manifest: &Manifest) -> String {
    match Version::parse(&manifest.version) {
        Ok(mut version) => {
            version.build = None;
            package_id(&manifest.package_name, &version)
        }
        Err(_) => manifest.id(),
    }
}

/// Resolves and materializes dependency trees
pub struct Installer {
    registry: Registry,
    host: Arc<dyn ContentHost>,
}

impl Installer {
    pub fn new(registry: Registry, host: Arc<dyn ContentHost>) -> Self {
        Self { registry, host }
    }

    /// Install the transitive dependencies of `manifest` under `destination`
    pub async fn install_dependencies(
        &self,
        manifest: &Manifest,
        destination: &Path,
    ) -> Result<InstallReport, InstallError> {
        info!(
            package = %manifest.id(),
            dependencies = manifest.dependencies.len(),
            destination = %destination.display(),
            "installing dependencies"
        );

        let (graph, packages) = self.resolve_graph(manifest).await?;
        check_cycles(&root_id(manifest), &graph)?;

        if packages.is_empty() {
            return Ok(InstallReport::default());
        }

        fs::create_dir_all(destination)
            .await
            .map_err(io_error(destination))?;

        let outcomes = try_join_all(
            packages
                .values()
                .map(|package| self.materialize(package, destination)),
        )
        .await?;

        let mut report = InstallReport::default();
        for (outcome, package) in outcomes.into_iter().zip(packages.values()) {
            let entry = InstalledPackage {
                name: package.name.clone(),
                version: package.version.clone(),
                path: destination.join(package.dir_name()),
            };
            match outcome {
                Materialized::Written => report.installed.push(entry),
                Materialized::AlreadyPresent => report.skipped.push(entry),
            }
        }

        info!(
            installed = report.installed.len(),
            skipped = report.skipped.len(),
            "install complete"
        );
        Ok(report)
    }

    /// Resolve the dependency closure of `root`
    ///
    /// Returns the edge list keyed by `name@version` (the root included) and every
    /// resolved package keyed the same way.
    async fn resolve_graph(
        &self,
        root: &Manifest,
    ) -> Result<(BTreeMap<String, Vec<String>>, BTreeMap<String, ResolvedPackage>), InstallError> {
        let root_id = root_id(root);
        let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut packages: BTreeMap<String, ResolvedPackage> = BTreeMap::new();

        graph.insert(root_id.clone(), Vec::new());
        let mut frontier: Vec<(String, String, String)> = root
            .dependencies
            .iter()
            .map(|(name, range)| (root_id.clone(), name.clone(), range.clone()))
            .collect();

        while !frontier.is_empty() {
            let entries = try_join_all(
                frontier
                    .iter()
                    .map(|(_, name, range)| self.registry.resolve(name, range)),
            )
            .await?;

            let mut to_fetch: BTreeMap<String, (String, Version, ContentUri)> = BTreeMap::new();
            for ((parent, name, range), entry) in frontier.iter().zip(entries) {
                let id = package_id(name, &entry.version);
                debug!(%parent, dependency = %name, %range, resolved = %id, "resolved edge");

                if let Some(children) = graph.get_mut(parent) {
                    children.push(id.clone());
                }
                if !graph.contains_key(&id) && !to_fetch.contains_key(&id) {
                    to_fetch.insert(id, (name.clone(), entry.version, entry.lockfile_uri));
                }
            }

            let fetched = try_join_all(
                to_fetch
                    .into_values()
                    .map(|(name, version, uri)| self.fetch_package(name, version, uri)),
            )
            .await?;

            frontier = Vec::new();
            for package in fetched {
                let id = package.id();
                frontier.extend(
                    package
                        .dependencies
                        .iter()
                        .map(|(name, range)| (id.clone(), name.clone(), range.clone())),
                );
                graph.insert(id.clone(), Vec::new());
                packages.insert(id, package);
            }
        }

        for children in graph.values_mut() {
            children.sort();
            children.dedup();
        }

        Ok((graph, packages))
    }

    /// Fetch and check the lockfile and manifest of one resolved version
    async fn fetch_package(
        &self,
        name: String,
        version: Version,
        lockfile_uri: ContentUri,
    ) -> Result<ResolvedPackage, InstallError> {
        let id = package_id(&name, &version);

        let lockfile_bytes = self.fetch(&id, "lockfile", &lockfile_uri).await?;
        let lockfile = Lockfile::from_slice(&lockfile_bytes).map_err(|source| InstallError::Lockfile {
            package: id.clone(),
            source,
        })?;

        let manifest_bytes = self
            .fetch(&id, MANIFEST_FILENAME, &lockfile.package_manifest)
            .await?;
        let manifest = Manifest::from_slice(&manifest_bytes).map_err(|source| InstallError::Manifest {
            package: id.clone(),
            source,
        })?;

        let published = Version::parse(&manifest.version).ok();
        if manifest.package_name != name || published.as_ref() != Some(&version) {
            return Err(InstallError::Mismatch {
                package: id,
                found: manifest.id(),
            });
        }

        Ok(ResolvedPackage {
            name,
            version,
            lockfile,
            manifest_bytes,
            dependencies: manifest.dependencies,
        })
    }

    async fn fetch(&self, package: &str, item: &str, uri: &ContentUri) -> Result<Vec<u8>, InstallError> {
        self.host.get(uri).await.map_err(|source| InstallError::Fetch {
            package: package.to_string(),
            item: item.to_string(),
            source,
        })
    }

    /// Write one package into its directory through a `.partial` sibling
    async fn materialize(
        &self,
        package: &ResolvedPackage,
        destination: &Path,
    ) -> Result<Materialized, InstallError> {
        let target = destination.join(package.dir_name());
        if fs::try_exists(&target).await.map_err(io_error(&target))? {
            debug!(package = %package.id(), "already installed");
            return Ok(Materialized::AlreadyPresent);
        }

        let partial = destination.join(format!(".{}.partial", package.dir_name()));
        if fs::try_exists(&partial).await.map_err(io_error(&partial))? {
            warn!(path = %partial.display(), "removing stale partial install");
            fs::remove_dir_all(&partial).await.map_err(io_error(&partial))?;
        }

        if let Err(e) = self.write_files(package, &partial).await {
            let _ = fs::remove_dir_all(&partial).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&partial, &target).await {
            let _ = fs::remove_dir_all(&partial).await;
            // Another installer finished the same version first
            if fs::try_exists(&target).await.unwrap_or(false) {
                return Ok(Materialized::AlreadyPresent);
            }
            return Err(InstallError::Io { path: target, source: e });
        }

        info!(package = %package.id(), path = %target.display(), "installed");
        Ok(Materialized::Written)
    }

    async fn write_files(&self, package: &ResolvedPackage, dir: &Path) -> Result<(), InstallError> {
        fs::create_dir_all(dir).await.map_err(io_error(dir))?;
        let id = package.id();

        try_join_all(package.lockfile.sources.iter().map(|(key, uri)| {
            let id = &id;
            async move {
                let bytes = self.fetch(id, key, uri).await?;
                let path = dir.join(source_key_path(key));
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).await.map_err(io_error(parent))?;
                }
                fs::write(&path, bytes).await.map_err(io_error(&path))
            }
        }))
        .await?;

        let manifest_path = dir.join(MANIFEST_FILENAME);
        fs::write(&manifest_path, &package.manifest_bytes)
            .await
            .map_err(io_error(&manifest_path))
    }
}

enum Materialized {
    Written,
    AlreadyPresent,
}

/// Fail if any cycle is reachable from `root`
fn check_cycles(root: &str, graph: &BTreeMap<String, Vec<String>>) -> Result<(), InstallError> {
    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    visit(root, graph, &mut visited, &mut stack)
}

/// Check for cycles using DFS
fn visit(
    node: &str,
    graph: &BTreeMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> Result<(), InstallError> {
    visited.insert(node.to_string());
    stack.push(node.to_string());

    if let Some(deps) = graph.get(node) {
        for dep in deps {
            if let Some(start) = stack.iter().position(|n| n == dep) {
                let mut chain = stack[start..].to_vec();
                chain.push(dep.clone());
                return Err(InstallError::DependencyCycle(chain.join(" -> ")));
            }
            if !visited.contains(dep) {
                visit(dep, graph, visited, stack)?;
            }
        }
    }

    stack.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
        let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (from, to) in edges {
            graph.entry(from.to_string()).or_default().push(to.to_string());
        }
        graph
    }

    #[test]
    fn test_acyclic_diamond() {
        let g = graph(&[
            ("app@1.0.0", "a@1.0.0"),
            ("app@1.0.0", "b@1.0.0"),
            ("a@1.0.0", "c@1.0.0"),
            ("b@1.0.0", "c@1.0.0"),
        ]);
        assert!(check_cycles("app@1.0.0", &g).is_ok());
    }

    #[test]
    fn test_cycle_chain_reported() {
        let g = graph(&[
            ("app@1.0.0", "a@1.0.0"),
            ("a@1.0.0", "b@1.0.0"),
            ("b@1.0.0", "a@1.0.0"),
        ]);

        match check_cycles("app@1.0.0", &g) {
            Err(InstallError::DependencyCycle(chain)) => {
                assert_eq!(chain, "a@1.0.0 -> b@1.0.0 -> a@1.0.0");
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency() {
        let g = graph(&[("app@1.0.0", "a@1.0.0"), ("a@1.0.0", "a@1.0.0")]);
        assert!(matches!(
            check_cycles("app@1.0.0", &g),
            Err(InstallError::DependencyCycle(_))
        ));
    }
}
