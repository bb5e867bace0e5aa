//! In-memory disk backend for failure-path tests

use super::backend::DiskBackend;
use super::error::DiskCacheError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MockDiskBackend {
    files: Mutex<HashMap<PathBuf, Bytes>>,
    storage_full: AtomicBool,
    permission_denied: AtomicBool,
}

impl MockDiskBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulate_storage_full(&self, enabled: bool) {
        self.storage_full.store(enabled, Ordering::SeqCst);
    }

    pub fn simulate_permission_denied(&self, enabled: bool) {
        self.permission_denied.store(enabled, Ordering::SeqCst);
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    fn check_permission(&self) -> Result<(), DiskCacheError> {
        if self.permission_denied.load(Ordering::SeqCst) {
            return Err(DiskCacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DiskBackend for MockDiskBackend {
    async fn read_file(&self, path: &Path) -> Result<Bytes, DiskCacheError> {
        self.check_permission()?;
        self.files.lock().get(path).cloned().ok_or_else(|| {
            DiskCacheError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "file not found",
            ))
        })
    }

    async fn write_file_atomic(&self, path: &Path, data: Bytes) -> Result<(), DiskCacheError> {
        self.check_permission()?;
        if self.storage_full.load(Ordering::SeqCst) {
            return Err(DiskCacheError::StorageFull);
        }
        self.files.lock().insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn create_dir_all(&self, _path: &Path) -> Result<(), DiskCacheError> {
        self.check_permission()
    }

    async fn file_size(&self, path: &Path) -> Result<u64, DiskCacheError> {
        self.read_file(path).await.map(|data| data.len() as u64)
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, DiskCacheError> {
        self.check_permission()?;
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }
}
