// Cache backends exercised through `build_cache` and the `Cache` trait

use bytes::Bytes;
use openimg::cache::*;
use tempfile::TempDir;

fn key(raw: &str) -> CacheKey {
    CacheKey::from_raw(raw)
}

#[tokio::test]
async fn test_memory_backend_round_trips_bytes() {
    let cache = build_cache(&CacheConfig::default()).await.unwrap();

    assert!(cache.get(&key("missing")).await.unwrap().is_none());

    cache
        .set(key("abc"), Bytes::from_static(b"image-bytes"))
        .await
        .unwrap();
    assert_eq!(
        cache.get(&key("abc")).await.unwrap(),
        Some(Bytes::from_static(b"image-bytes"))
    );
}

#[tokio::test]
async fn test_memory_backend_counts_hits_and_misses() {
    let cache = build_cache(&CacheConfig::default()).await.unwrap();
    cache.set(key("k"), Bytes::from_static(b"v")).await.unwrap();

    cache.get(&key("k")).await.unwrap();
    cache.get(&key("k")).await.unwrap();
    cache.get(&key("other")).await.unwrap();
    cache.run_pending_tasks().await;

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_disk_backend_survives_reconstruction() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig {
        backend: CacheBackend::Disk,
        disk: DiskCacheConfig {
            cache_dir: temp_dir.path().display().to_string(),
        },
        ..Default::default()
    };

    let first = build_cache(&config).await.unwrap();
    first
        .set(key("persisted"), Bytes::from_static(b"data"))
        .await
        .unwrap();
    drop(first);

    let second = build_cache(&config).await.unwrap();
    assert_eq!(
        second.get(&key("persisted")).await.unwrap(),
        Some(Bytes::from_static(b"data"))
    );
}

#[tokio::test]
async fn test_none_backend_never_returns_entries() {
    let config = CacheConfig {
        backend: CacheBackend::None,
        ..Default::default()
    };
    let cache = build_cache(&config).await.unwrap();

    cache.set(key("k"), Bytes::from_static(b"v")).await.unwrap();
    assert!(cache.get(&key("k")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_config_is_a_configuration_error() {
    let config = CacheConfig {
        backend: CacheBackend::Disk,
        disk: DiskCacheConfig {
            cache_dir: String::new(),
        },
        ..Default::default()
    };
    let err = build_cache(&config).await.err().unwrap();
    assert!(matches!(err, CacheError::ConfigurationError(_)));
}
