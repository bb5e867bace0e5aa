// Cache behaviour observed through the HTTP surface

use std::time::Duration;
use tempfile::TempDir;

use super::test_harness::{image_path, sample_jpeg, Origin, TestServer};
use openimg::cache::{CacheBackend, CacheConfig, DiskCacheConfig};

#[tokio::test]
async fn test_memory_cache_serves_repeat_requests() {
    let origin = Origin::start(sample_jpeg(200, 200), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;
    let path = image_path(&origin.url("/photo.jpg"), "w=50&fmt=webp");

    let first = server.get(&path).await;
    let second = server.get(&path).await;

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 200);
    assert_eq!(second.content_type(), "image/webp");
    assert_eq!(first.body, second.body);
    assert_eq!(origin.hits(), 1);
    assert_eq!(server.service.metrics().cache_hits(), 1);
}

#[tokio::test]
async fn test_cached_source_format_keeps_content_type() {
    let origin = Origin::start(sample_jpeg(80, 80), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;
    let path = image_path(&origin.url("/photo.jpg"), "w=40");

    assert_eq!(server.get(&path).await.content_type(), "image/jpeg");
    assert_eq!(server.get(&path).await.content_type(), "image/jpeg");
    assert_eq!(origin.hits(), 1);
}

#[tokio::test]
async fn test_distinct_variants_are_cached_separately() {
    let origin = Origin::start(sample_jpeg(200, 200), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;

    server
        .get(&image_path(&origin.url("/photo.jpg"), "w=50"))
        .await;
    server
        .get(&image_path(&origin.url("/photo.jpg"), "w=60"))
        .await;
    server
        .get(&image_path(&origin.url("/photo.jpg"), "placeholder=true"))
        .await;

    assert_eq!(origin.hits(), 3);
}

#[tokio::test]
async fn test_disk_cache_persists_across_servers() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig {
        backend: CacheBackend::Disk,
        disk: DiskCacheConfig {
            cache_dir: temp_dir.path().display().to_string(),
        },
        ..Default::default()
    };
    let origin = Origin::start(sample_jpeg(100, 100), Duration::ZERO).await;
    let path = image_path(&origin.url("/photo.jpg"), "w=20&fmt=png");

    let first = {
        let server = TestServer::start(&config, true).await;
        server.get(&path).await
    };
    let server = TestServer::start(&config, true).await;
    let second = server.get(&path).await;

    assert_eq!(first.body, second.body);
    assert_eq!(second.content_type(), "image/png");
    assert_eq!(origin.hits(), 1);
}

#[tokio::test]
async fn test_disabled_cache_recomputes() {
    let origin = Origin::start(sample_jpeg(100, 100), Duration::ZERO).await;
    let config = CacheConfig {
        backend: CacheBackend::None,
        ..Default::default()
    };
    let server = TestServer::start(&config, true).await;
    let path = image_path(&origin.url("/photo.jpg"), "w=20");

    assert_eq!(server.get(&path).await.status, 200);
    assert_eq!(server.get(&path).await.status, 200);
    assert_eq!(origin.hits(), 2);
}
