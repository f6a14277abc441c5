//! In-memory content store.
//!
//! Non-persistent and process-local; used for tests and for single-process
//! deployments where the cache only needs to live as long as the server.

use async_trait::async_trait;
use dashmap::DashMap;

use super::key::CacheKey;
use super::store::{CacheError, CachedArtifact, ContentStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<CacheKey, CachedArtifact>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, artifact: &CachedArtifact) -> Result<(), CacheError> {
        self.entries.insert(artifact.key.clone(), artifact.clone());
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.entries.contains_key(key))
    }
}
