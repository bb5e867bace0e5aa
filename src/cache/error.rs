//! Cache error types
//!
//! A miss is not an error: backends report it as `Ok(None)` from `get`.

/// Cache error types
#[derive(Debug)]
pub enum CacheError {
    /// Entry exceeds the backend's per-item limit
    StorageFull,
    /// I/O error (for disk cache)
    IoError(std::io::Error),
    /// Configuration error
    ConfigurationError(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::StorageFull => write!(f, "Cache storage is full"),
            CacheError::IoError(err) => write!(f, "I/O error: {}", err),
            CacheError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::IoError(err)
    }
}
