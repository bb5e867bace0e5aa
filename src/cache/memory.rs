//! Memory cache implementation
//!
//! This module provides in-memory cache implementations:
//! - `MemoryCache`: bounded, TTL-expiring cache backed by moka
//! - `NullCache`: no-op implementation for disabled caching

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::config::MemoryCacheConfig;
use super::error::CacheError;
use super::key::CacheKey;
use super::stats::{CacheStats, CacheStatsTracker};
use super::traits::Cache;

/// MemoryCache wraps moka for our Cache trait
pub struct MemoryCache {
    cache: moka::future::Cache<CacheKey, Bytes>,
    stats: Arc<CacheStatsTracker>,
    max_item_size_bytes: u64,
    max_cache_size_bytes: u64,
}

impl MemoryCache {
    /// Create a new MemoryCache from configuration
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let stats = Arc::new(CacheStatsTracker::new());
        let stats_clone = stats.clone();

        let cache = moka::future::Cache::builder()
            .max_capacity(config.max_cache_size_bytes())
            .time_to_live(Duration::from_secs(config.default_ttl_seconds))
            .weigher(|_key, value: &Bytes| u32::try_from(value.len()).unwrap_or(u32::MAX))
            .eviction_listener(move |_key, _value, cause| {
                use moka::notification::RemovalCause;
                // Replacements and explicit invalidation are not evictions
                if matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    stats_clone.increment_evictions();
                }
            })
            .build();

        Self {
            cache,
            stats,
            max_item_size_bytes: config.max_item_size_bytes(),
            max_cache_size_bytes: config.max_cache_size_bytes(),
        }
    }

    /// Spawn the background sweep that reclaims expired entries.
    ///
    /// moka only reclaims lazily on access; without traffic expired entries
    /// would keep their memory until the next read or write.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                cache.cache.run_pending_tasks().await;
                tracing::debug!(
                    entries = cache.cache.entry_count(),
                    weighted_size = cache.cache.weighted_size(),
                    "Memory cache sweep completed"
                );
            }
        })
    }

    /// Get current entry count (approximate due to eventual consistency)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        match self.cache.get(key).await {
            Some(value) => {
                self.stats.increment_hits();
                Ok(Some(value))
            }
            None => {
                self.stats.increment_misses();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: CacheKey, value: Bytes) -> Result<(), CacheError> {
        if value.len() as u64 > self.max_item_size_bytes {
            return Err(CacheError::StorageFull);
        }
        self.cache.insert(key, value).await;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(self.stats.snapshot(
            self.cache.weighted_size(),
            self.cache.entry_count(),
            self.max_cache_size_bytes,
        ))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// NullCache is a no-op cache implementation used when caching is disabled
pub struct NullCache;

#[async_trait]
impl Cache for NullCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: CacheKey, _value: Bytes) -> Result<(), CacheError> {
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats::default())
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
