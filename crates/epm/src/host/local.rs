//! On-disk content-addressed store

use super::{sha256_hex, ContentHost, ContentUri, HostError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Distinguishes concurrent temporary files within one process
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content-addressable store on the local filesystem
///
/// Blobs are addressed as `local://<sha256>`.
///
/// Directory structure:
/// ```text
/// <root>/
/// ├── blobs/
/// │   └── <sha256-hash>
/// └── tmp/
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    /// Root store directory
    root: PathBuf,
}

impl LocalStore {
    pub const SCHEME: &'static str = "local";

    /// Open a store rooted at `root`, creating the directory layout if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, HostError> {
        let root = root.into();

        for dir in [root.join("blobs"), root.join("tmp")] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| HostError::io(&dir, e))?;
        }

        Ok(Self { root })
    }

    /// Path of the blob stored under `hash`
    pub fn blob_path(&self, hash: &str) -> PathBuf {
        self.root.join("blobs").join(hash)
    }

    /// Check if a blob exists in the store
    pub async fn contains(&self, uri: &ContentUri) -> bool {
        uri.scheme() == Self::SCHEME && fs::try_exists(self.blob_path(uri.hash())).await.unwrap_or(false)
    }
}

#[async_trait]
impl ContentHost for LocalStore {
    async fn put_contents(&self, bytes: &[u8]) -> Result<ContentUri, HostError> {
        let hash = sha256_hex(bytes);
        let uri = ContentUri::new(Self::SCHEME, hash.clone())?;
        let final_path = self.blob_path(&hash);

        // Check if already stored
        if fs::try_exists(&final_path).await.unwrap_or(false) {
            debug!(%uri, "blob already stored");
            return Ok(uri);
        }

        // Write to temporary file first (atomic write)
        let tmp_path = self.root.join("tmp").join(format!(
            "{}.{}.{}.tmp",
            hash,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let mut tmp_file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| HostError::io(&tmp_path, e))?;
        tmp_file
            .write_all(bytes)
            .await
            .map_err(|e| HostError::io(&tmp_path, e))?;
        tmp_file
            .sync_all()
            .await
            .map_err(|e| HostError::io(&tmp_path, e))?;
        drop(tmp_file);

        // Move to final location; a concurrent writer may have won the race
        if let Err(e) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            if !fs::try_exists(&final_path).await.unwrap_or(false) {
                return Err(HostError::io(&final_path, e));
            }
        }

        debug!(%uri, size = bytes.len(), "stored blob");
        Ok(uri)
    }

    async fn get(&self, uri: &ContentUri) -> Result<Vec<u8>, HostError> {
        uri.expect_scheme(Self::SCHEME)?;
        let path = self.blob_path(uri.hash());

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HostError::NotFound(uri.clone()));
            }
            Err(e) => return Err(HostError::io(&path, e)),
        };

        // Verify checksum
        let actual = sha256_hex(&bytes);
        if actual != uri.hash() {
            return Err(HostError::ChecksumMismatch {
                uri: uri.clone(),
                actual,
            });
        }

        Ok(bytes)
    }
}
