//! In-memory registry backend

use super::{RegistryBackend, RegistryError};
use crate::host::ContentUri;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Registry entries held in process memory
///
/// The reference backend: a single map guarded by a mutex, which makes
/// insert-if-absent trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    packages: Mutex<HashMap<String, HashMap<String, ContentUri>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    async fn versions(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        let packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(packages
            .get(name)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn lookup(&self, name: &str, version: &str) -> Result<Option<ContentUri>, RegistryError> {
        let packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(packages
            .get(name)
            .and_then(|versions| versions.get(version))
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        name: &str,
        version: &str,
        uri: &ContentUri,
    ) -> Result<bool, RegistryError> {
        let mut packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        let versions = packages.entry(name.to_string()).or_default();

        if versions.contains_key(version) {
            return Ok(false);
        }
        versions.insert(version.to_string(), uri.clone());
        Ok(true)
    }
}
