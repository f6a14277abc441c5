//! Filesystem content store.
//!
//! Each key is stored under `root/<d[0..2]>/<d>.bin` with a `<d>.json`
//! metadata sidecar, where `d` is the blake3 digest of the key. Both files
//! are written to a temp file in the same directory and renamed into place,
//! so a reader sees either the complete artifact or nothing.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::store::{CacheError, CachedArtifact, ContentStore};

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactMetadata {
    key: String,
    content_type: String,
    cache_control: String,
}

#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn paths(&self, key: &CacheKey) -> (PathBuf, PathBuf, PathBuf) {
        let digest = key.digest();
        let dir = self.root.join(&digest[..2]);
        let body = dir.join(format!("{digest}.bin"));
        let meta = dir.join(format!("{digest}.json"));
        (dir, body, meta)
    }
}

fn write_atomically(dir: &Path, target: &Path, contents: &[u8]) -> Result<(), CacheError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| CacheError::Io(e.error))?;
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ContentStore for FilesystemStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
        let (_, body_path, meta_path) = self.paths(key);

        let Some(body) = read_optional(&body_path).await? else {
            return Ok(None);
        };
        let Some(meta) = read_optional(&meta_path).await? else {
            warn!(key = %key, "Cache body present without metadata, treating as miss");
            return Ok(None);
        };

        let meta: ArtifactMetadata = serde_json::from_slice(&meta)?;
        if meta.key != key.as_str() {
            warn!(key = %key, stored = %meta.key, "Cache digest collision, treating as miss");
            return Ok(None);
        }

        Ok(Some(CachedArtifact {
            key: key.clone(),
            bytes: Bytes::from(body),
            content_type: meta.content_type,
            cache_control: meta.cache_control,
        }))
    }

    async fn put(&self, artifact: &CachedArtifact) -> Result<(), CacheError> {
        let (dir, body_path, meta_path) = self.paths(&artifact.key);
        let meta = serde_json::to_vec(&ArtifactMetadata {
            key: artifact.key.as_str().to_string(),
            content_type: artifact.content_type.clone(),
            cache_control: artifact.cache_control.clone(),
        })?;
        let body = artifact.bytes.clone();

        // Metadata lands first; readers key off the body file.
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            write_atomically(&dir, &meta_path, &meta)?;
            write_atomically(&dir, &body_path, &body)
        })
        .await
        .map_err(|e| CacheError::Task(e.to_string()))??;

        debug!(key = %artifact.key, size = artifact.bytes.len(), "Stored artifact on disk");
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let (_, body_path, _) = self.paths(key);
        Ok(tokio::fs::try_exists(body_path).await?)
    }
}
