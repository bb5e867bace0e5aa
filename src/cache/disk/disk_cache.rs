//! Main DiskCache implementation

use super::backend::DiskBackend;
use super::error::DiskCacheError;
use super::tokio_backend::{TokioFsBackend, TEMP_FILE_PREFIX};
use crate::cache::{Cache, CacheError, CacheKey, CacheStats};
use crate::cache::stats::CacheStatsTracker;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Disk-based cache: one file per key, no expiry and no size bound
pub struct DiskCache {
    root: PathBuf,
    backend: Arc<dyn DiskBackend>,
    stats: CacheStatsTracker,
}

impl DiskCache {
    /// Open (creating if needed) a cache rooted at `root`
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Self::with_backend(root, Arc::new(TokioFsBackend::new())).await
    }

    /// Open a cache over a specific filesystem backend
    pub async fn with_backend(
        root: impl Into<PathBuf>,
        backend: Arc<dyn DiskBackend>,
    ) -> Result<Self, CacheError> {
        let root = root.into();
        backend.create_dir_all(&root).await?;
        tracing::info!(cache_dir = %root.display(), "Disk cache initialized");
        Ok(Self {
            root,
            backend,
            stats: CacheStatsTracker::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to its file path, refusing anything that could escape
    /// the root or collide with an in-progress write
    fn entry_path(&self, key: &CacheKey) -> Result<PathBuf, DiskCacheError> {
        let name = key.as_str();
        let safe = !name.is_empty()
            && !name.starts_with(TEMP_FILE_PREFIX)
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !safe {
            return Err(DiskCacheError::InvalidFileName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let path = self.entry_path(key)?;
        match self.backend.read_file(&path).await {
            Ok(data) => {
                self.stats.increment_hits();
                Ok(Some(data))
            }
            Err(e) if e.is_not_found() => {
                self.stats.increment_misses();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: CacheKey, value: Bytes) -> Result<(), CacheError> {
        let path = self.entry_path(&key)?;
        self.backend.write_file_atomic(&path, value).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut size = 0u64;
        let mut count = 0u64;
        for path in self.backend.read_dir(&self.root).await? {
            let is_temp = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with(TEMP_FILE_PREFIX))
                .unwrap_or(true);
            if is_temp {
                continue;
            }
            match self.backend.file_size(&path).await {
                Ok(len) => {
                    size += len;
                    count += 1;
                }
                // Replaced or removed between listing and stat
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.stats.snapshot(size, count, 0))
    }

    fn backend(&self) -> &'static str {
        "disk"
    }
}
