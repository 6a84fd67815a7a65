//! Content-addressed storage
//!
//! A content host stores bytes under a URI derived from their hash and hands the
//! same bytes back for that URI. The engine only relies on the [`ContentHost`]
//! trait; [`MemoryHost`] and [`LocalStore`] are the bundled backends and
//! [`HostRouter`] dispatches between several of them by URI scheme.

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryHost;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while storing or fetching content
#[derive(Debug, Error)]
pub enum HostError {
    /// No backend handles this URI scheme
    #[error("Unsupported URI scheme '{scheme}' in {uri}")]
    UnsupportedScheme { scheme: String, uri: String },

    /// Backend cannot resolve the hash
    #[error("Content not found: {0}")]
    NotFound(ContentUri),

    /// String is not of the form `<scheme>://<hash>`
    #[error("Invalid content URI: {0}")]
    InvalidUri(String),

    /// Stored bytes no longer hash to their URI
    #[error("Checksum mismatch for {uri}: content hashes to {actual}")]
    ChecksumMismatch { uri: ContentUri, actual: String },

    /// Filesystem failure
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl HostError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        HostError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// A `<scheme>://<hash>` reference to immutable content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri {
    scheme: String,
    hash: String,
}

impl ContentUri {
    /// Build a URI from its parts
    pub fn new(scheme: impl Into<String>, hash: impl Into<String>) -> Result<Self, HostError> {
        let scheme = scheme.into();
        let hash = hash.into();

        let scheme_ok = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        let hash_ok = !hash.is_empty() && !hash.contains(['/', '\\']) && hash != "." && hash != "..";

        if !scheme_ok || !hash_ok {
            return Err(HostError::InvalidUri(format!("{}://{}", scheme, hash)));
        }

        Ok(Self { scheme, hash })
    }

    /// Parse `<scheme>://<hash>`
    pub fn parse(s: &str) -> Result<Self, HostError> {
        let (scheme, hash) = s
            .split_once("://")
            .ok_or_else(|| HostError::InvalidUri(s.to_string()))?;
        Self::new(scheme, hash)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Fail with `UnsupportedScheme` unless this URI uses `scheme`
    pub fn expect_scheme(&self, scheme: &str) -> Result<(), HostError> {
        if self.scheme == scheme {
            Ok(())
        } else {
            Err(HostError::UnsupportedScheme {
                scheme: self.scheme.clone(),
                uri: self.to_string(),
            })
        }
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.hash)
    }
}

impl FromStr for ContentUri {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentUri::parse(s)
    }
}

impl TryFrom<String> for ContentUri {
    type Error = HostError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContentUri::parse(&value)
    }
}

impl From<ContentUri> for String {
    fn from(uri: ContentUri) -> Self {
        uri.to_string()
    }
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Content-addressed blob store capability
///
/// Implementations must be safe to call concurrently, and storing identical
/// bytes twice must yield the same URI.
#[async_trait]
pub trait ContentHost: Send + Sync {
    /// Store the contents of a file
    async fn put_file(&self, path: &Path) -> Result<ContentUri, HostError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| HostError::io(path, e))?;
        self.put_contents(&bytes).await
    }

    /// Store raw bytes
    async fn put_contents(&self, bytes: &[u8]) -> Result<ContentUri, HostError>;

    /// Fetch the bytes stored under `uri`
    async fn get(&self, uri: &ContentUri) -> Result<Vec<u8>, HostError>;
}

#[async_trait]
impl<T: ContentHost + ?Sized> ContentHost for Arc<T> {
    async fn put_file(&self, path: &Path) -> Result<ContentUri, HostError> {
        (**self).put_file(path).await
    }

    async fn put_contents(&self, bytes: &[u8]) -> Result<ContentUri, HostError> {
        (**self).put_contents(bytes).await
    }

    async fn get(&self, uri: &ContentUri) -> Result<Vec<u8>, HostError> {
        (**self).get(uri).await
    }
}

/// Routes reads by URI scheme and writes to a primary backend
pub struct HostRouter {
    primary: Arc<dyn ContentHost>,
    backends: HashMap<String, Arc<dyn ContentHost>>,
}

impl HostRouter {
    /// Create a router whose puts go to `primary`, registered under `scheme`
    pub fn new(scheme: impl Into<String>, primary: Arc<dyn ContentHost>) -> Self {
        let mut backends = HashMap::new();
        backends.insert(scheme.into(), Arc::clone(&primary));
        Self { primary, backends }
    }

    /// Register an additional read backend
    pub fn with_backend(mut self, scheme: impl Into<String>, backend: Arc<dyn ContentHost>) -> Self {
        self.backends.insert(scheme.into(), backend);
        self
    }

    /// Schemes this router can read
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

#[async_trait]
impl ContentHost for HostRouter {
    async fn put_file(&self, path: &Path) -> Result<ContentUri, HostError> {
        self.primary.put_file(path).await
    }

    async fn put_contents(&self, bytes: &[u8]) -> Result<ContentUri, HostError> {
        self.primary.put_contents(bytes).await
    }

    async fn get(&self, uri: &ContentUri) -> Result<Vec<u8>, HostError> {
        match self.backends.get(uri.scheme()) {
            Some(backend) => backend.get(uri).await,
            None => Err(HostError::UnsupportedScheme {
                scheme: uri.scheme().to_string(),
                uri: uri.to_string(),
            }),
        }
    }
}
