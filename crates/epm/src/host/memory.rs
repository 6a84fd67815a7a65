//! In-process content host

use super::{sha256_hex, ContentHost, ContentUri, HostError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Content-addressed store held in memory, addressed as `memory://<sha256>`
///
/// Counts every put and get so callers can assert on traffic.
#[derive(Debug, Default)]
pub struct MemoryHost {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl MemoryHost {
    pub const SCHEME: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put_file`/`put_contents` calls served
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `get` calls served
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of distinct blobs stored
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentHost for MemoryHost {
    async fn put_contents(&self, bytes: &[u8]) -> Result<ContentUri, HostError> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        let hash = sha256_hex(bytes);
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(hash.clone())
            .or_insert_with(|| bytes.to_vec());

        ContentUri::new(Self::SCHEME, hash)
    }

    async fn get(&self, uri: &ContentUri) -> Result<Vec<u8>, HostError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        uri.expect_scheme(Self::SCHEME)?;

        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri.hash())
            .cloned()
            .ok_or_else(|| HostError::NotFound(uri.clone()))
    }
}
