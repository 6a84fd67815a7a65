//! Package publishing
//!
//! Publishing uploads the manifest and every expanded source file, pins them in a
//! lockfile, uploads the lockfile and registers its URI. Registration is the
//! last step: a failure anywhere before it leaves only orphaned content behind,
//! which content addressing makes harmless.

use crate::host::{ContentHost, ContentUri, HostError};
use crate::lockfile::{Lockfile, LockfileError};
use crate::manifest::{Manifest, ManifestError};
use crate::registry::{Registry, RegistryError};
use crate::sources::{self, SourceError};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Errors that can occur during publishing
#[derive(Debug, Error)]
pub enum PublishError {
    /// Manifest could not be read or interpreted
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A contract named in the manifest has no metadata
    #[error("Missing metadata for contract {0}")]
    MissingContractMetadata(String),

    /// Source expansion failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Content host rejected an upload
    #[error("Failed to upload {item}: {source}")]
    Upload {
        item: String,
        #[source]
        source: HostError,
    },

    /// Lockfile could not be built
    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    /// Registration failed (including an already published version)
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub package_name: String,
    pub version: String,
    pub lockfile_uri: ContentUri,
    pub lockfile: Lockfile,
}

/// Uploads packages and registers them
pub struct Publisher {
    registry: Registry,
    host: Arc<dyn ContentHost>,
}

impl Publisher {
    pub fn new(registry: Registry, host: Arc<dyn ContentHost>) -> Self {
        Self { registry, host }
    }

    /// Publish the package described by `manifest_path`
    ///
    /// `sources` are resolved against `base_path`, and `contract_metadata` must
    /// hold an entry for every contract the manifest lists.
    pub async fn publish(
        &self,
        manifest_path: &Path,
        base_path: &Path,
        contract_metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<PublishReceipt, PublishError> {
        let raw = fs::read(manifest_path).await.map_err(|source| ManifestError::Io {
            path: manifest_path.display().to_string(),
            source,
        })?;
        let manifest = Manifest::from_slice(&raw)?;

        info!(package = %manifest.id(), "publishing");

        if let Some(missing) = manifest
            .contracts
            .iter()
            .find(|name| !contract_metadata.contains_key(*name))
        {
            return Err(PublishError::MissingContractMetadata(missing.clone()));
        }

        let package_manifest = self
            .host
            .put_file(manifest_path)
            .await
            .map_err(|source| PublishError::Upload {
                item: manifest_path.display().to_string(),
                source,
            })?;
        debug!(uri = %package_manifest, "uploaded manifest");

        let files = sources::expand(&manifest.sources, base_path).await?;
        let keyed = files
            .iter()
            .map(|file| Ok((sources::relative_key(base_path, file)?, file)))
            .collect::<Result<Vec<_>, SourceError>>()?;

        let uploads = keyed.into_iter().map(|(key, file)| async move {
            let uri = self
                .host
                .put_file(file)
                .await
                .map_err(|source| PublishError::Upload {
                    item: key.clone(),
                    source,
                })?;
            debug!(%key, %uri, "uploaded source");
            Ok::<_, PublishError>((key, uri))
        });
        let sources: BTreeMap<String, ContentUri> = try_join_all(uploads).await?.into_iter().collect();

        let lockfile = Lockfile {
            version: manifest.version.clone(),
            manifest_version: manifest.manifest_version,
            package_manifest,
            sources,
            contracts: contract_metadata,
        };
        lockfile.validate()?;

        let lockfile_uri = self
            .host
            .put_contents(&lockfile.to_json()?)
            .await
            .map_err(|source| PublishError::Upload {
                item: "lockfile".to_string(),
                source,
            })?;

        self.registry
            .register(&manifest.package_name, &manifest.version, &lockfile_uri)
            .await?;

        info!(
            package = %manifest.id(),
            files = lockfile.sources.len(),
            lockfile = %lockfile_uri,
            "published"
        );

        Ok(PublishReceipt {
            package_name: manifest.package_name,
            version: manifest.version,
            lockfile_uri,
            lockfile,
        })
    }
}
