//! Boundary trait for the content cache.
//!
//! The store is an append-only key→bytes map. There is no update or delete:
//! every key names one deterministic output, so a second `put` under the same
//! key writes identical bytes and is harmless.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::key::CacheKey;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Cache task failed: {0}")]
    Task(String),
}

/// An encoded artifact together with the headers it is served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub key: CacheKey,
    pub bytes: Bytes,
    pub content_type: String,
    pub cache_control: String,
}

#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Returns `Ok(None)` when the key has never been written.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError>;

    /// Stores a complete artifact. Callers only invoke this once the full
    /// byte sequence is in hand.
    async fn put(&self, artifact: &CachedArtifact) -> Result<(), CacheError>;

    async fn exists(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }
}
