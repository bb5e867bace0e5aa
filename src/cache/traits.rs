//! Cache trait definition
//!
//! Every backend (memory, disk, no-op) implements `Cache` with the same
//! semantics, so the request path never branches on which one is configured.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::CacheError;
use super::key::CacheKey;
use super::stats::CacheStats;

#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a key.
    /// Returns `Ok(None)` if the key was never written, was evicted or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Store a value, overwriting any previous value for the key.
    /// Either the full value is stored or nothing is.
    async fn set(&self, key: CacheKey, value: Bytes) -> Result<(), CacheError>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Backend name, for logging
    fn backend(&self) -> &'static str;

    /// Run pending maintenance (expiry, eviction). No-op by default.
    async fn run_pending_tasks(&self) {}
}
