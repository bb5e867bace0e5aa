//! Disk-based cache implementation
//!
//! One file per cache key under a configured root directory. The file name is
//! the cache key and the content is the raw encoded image, with no framing.
//! Filesystem access goes through the [`DiskBackend`] trait so tests can
//! substitute failing or in-memory backends.

pub use self::backend::DiskBackend;
pub use self::disk_cache::DiskCache;
pub use self::error::DiskCacheError;
pub use self::tokio_backend::TokioFsBackend;

pub mod backend;
mod disk_cache;
mod error;
pub mod tokio_backend;

#[cfg(test)]
mod mock_backend;
