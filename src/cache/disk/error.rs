//! Error types for disk cache operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiskCacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage full: cannot store entry")]
    StorageFull,

    #[error("Invalid cache file name: {0}")]
    InvalidFileName(String),
}

impl DiskCacheError {
    /// True when the underlying error means "no such file"
    pub fn is_not_found(&self) -> bool {
        matches!(self, DiskCacheError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

// Conversion to CacheError
impl From<DiskCacheError> for crate::cache::CacheError {
    fn from(err: DiskCacheError) -> Self {
        match err {
            DiskCacheError::Io(e) => crate::cache::CacheError::IoError(e),
            DiskCacheError::StorageFull => crate::cache::CacheError::StorageFull,
            DiskCacheError::InvalidFileName(name) => crate::cache::CacheError::IoError(
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid cache file name: {}", name),
                ),
            ),
        }
    }
}
