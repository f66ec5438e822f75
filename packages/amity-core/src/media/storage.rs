//! Object storage for uploaded media bytes.
//!
//! Keys are relative, `/`-separated paths such as
//! `uploads/{user}/{ts}-{hash}.png`. The filesystem backend lays them out
//! under `{DATA_DIR}/media/` and writes atomically (write to `.tmp`, then
//! rename).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::error::{Error, Result};

/// Blob store contract used by [`MediaService`](super::MediaService).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()>;

    /// Read the bytes under `key`. Missing keys are [`Error::MediaNotFound`].
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Remove `key`. Returns false if it was not present.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(Error::Validation(format!("Invalid storage key: {}", key)));
    }
    Ok(())
}

/// Filesystem-backed object storage.
#[derive(Debug, Clone)]
pub struct FsObjectStorage {
    root: PathBuf,
}

impl FsObjectStorage {
    /// Store objects under `{data_dir}/media`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join("media"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                tracing::error!(error = %e, key, "Failed to create media directory");
                Error::ObjectStorage(format!("Failed to create storage directory: {}", e))
            })?;
        }

        // Atomic write: write to .tmp, then rename
        let tmp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp_path, &bytes).await {
            tracing::error!(error = %e, path = %tmp_path.display(), "Failed to write media file");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(Error::ObjectStorage(format!("Failed to write media file: {}", e)));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            tracing::error!(error = %e, "Failed to rename temp media file");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(Error::ObjectStorage(format!("Failed to finalize media file: {}", e)));
        }

        tracing::debug!(key, size = bytes.len(), "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::MediaNotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory object storage, used when no data directory is configured.
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    objects: DashMap<String, Bytes>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<()> {
        validate_key(key)?;
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::MediaNotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.objects.remove(key).is_some())
    }
}
