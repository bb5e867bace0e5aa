// Cache module

pub mod config;
pub mod disk;
pub mod error;
pub mod key;
pub mod memory;
pub mod stats;
pub mod traits;

pub use config::{CacheBackend, CacheConfig, DiskCacheConfig, MemoryCacheConfig};
pub use disk::DiskCache;
pub use error::CacheError;
pub use key::{derive_key, CacheKey, RequestKind, CACHE_KEY_LEN};
pub use memory::{MemoryCache, NullCache};
pub use stats::CacheStats;
pub use traits::Cache;

use std::sync::Arc;
use std::time::Duration;

/// Construct the configured cache backend.
///
/// For the memory backend the periodic expiry sweep is started when a tokio
/// runtime is available; it stops on its own once the cache is dropped.
pub async fn build_cache(config: &CacheConfig) -> Result<Arc<dyn Cache>, CacheError> {
    config.validate().map_err(CacheError::ConfigurationError)?;

    let cache: Arc<dyn Cache> = match config.backend {
        CacheBackend::Memory => {
            let cache = Arc::new(MemoryCache::new(&config.memory));
            if tokio::runtime::Handle::try_current().is_ok() {
                cache.spawn_sweeper(Duration::from_secs(
                    config.memory.cleanup_interval_seconds,
                ));
            }
            cache
        }
        CacheBackend::Disk => Arc::new(DiskCache::new(&config.disk.cache_dir).await?),
        CacheBackend::None => Arc::new(NullCache),
    };

    tracing::info!(backend = cache.backend(), "Cache initialized");
    Ok(cache)
}
