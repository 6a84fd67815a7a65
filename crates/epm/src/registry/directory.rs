//! Filesystem registry backend

use super::{RegistryBackend, RegistryError};
use crate::host::ContentUri;
use crate::manifest::is_valid_package_name;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Registry stored as one file per version
///
/// ```text
/// <root>/
/// ├── .tmp/
/// └── <package>/
///     ├── 1.0.0      # contains the lockfile URI
///     └── 1.1.0
/// ```
///
/// An entry is written to a temporary file and hard-linked into place. Linking
/// fails when the target exists, so registration is an atomic check-and-set even
/// across processes sharing the directory.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
}

impl DirectoryRegistry {
    /// Open a registry rooted at `root`, creating it if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let root = root.into();
        let tmp = root.join(".tmp");
        fs::create_dir_all(&tmp).await.map_err(|e| io_error(&tmp, e))?;
        Ok(Self { root })
    }

    fn package_dir(&self, name: &str) -> Result<PathBuf, RegistryError> {
        if !is_valid_package_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn entry_path(&self, name: &str, version: &str) -> Result<PathBuf, RegistryError> {
        let valid_version = !version.is_empty()
            && !version.starts_with('.')
            && version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'));
        if !valid_version {
            return Err(RegistryError::Corrupt {
                package: name.to_string(),
                version: version.to_string(),
                reason: "version is not usable as a file name".to_string(),
            });
        }
        Ok(self.package_dir(name)?.join(version))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl RegistryBackend for DirectoryRegistry {
    async fn versions(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        let dir = self.package_dir(name)?;

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            if let Some(file_name) = entry.file_name().to_str() {
                if !file_name.starts_with('.') {
                    versions.push(file_name.to_string());
                }
            }
        }

        Ok(versions)
    }

    async fn lookup(&self, name: &str, version: &str) -> Result<Option<ContentUri>, RegistryError> {
        let path = self.entry_path(name, version)?;

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        ContentUri::parse(content.trim())
            .map(Some)
            .map_err(|e| RegistryError::Corrupt {
                package: name.to_string(),
                version: version.to_string(),
                reason: e.to_string(),
            })
    }

    async fn insert_if_absent(
        &self,
        name: &str,
        version: &str,
        uri: &ContentUri,
    ) -> Result<bool, RegistryError> {
        let path = self.entry_path(name, version)?;
        let dir = self.package_dir(name)?;
        fs::create_dir_all(&dir).await.map_err(|e| io_error(&dir, e))?;

        if fs::try_exists(&path).await.map_err(|e| io_error(&path, e))? {
            return Ok(false);
        }

        let tmp = self.root.join(".tmp").join(format!(
            "{}-{}.{}.{}",
            name,
            version,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, uri.to_string())
            .await
            .map_err(|e| io_error(&tmp, e))?;

        let linked = fs::hard_link(&tmp, &path).await;
        let _ = fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
