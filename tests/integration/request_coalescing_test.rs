// Identical concurrent requests share one upstream fetch

use futures::future::join_all;
use std::time::Duration;

use super::test_harness::{image_path, sample_jpeg, Origin, TestServer};
use openimg::cache::{CacheBackend, CacheConfig};

#[tokio::test]
async fn test_concurrent_identical_requests_fetch_once() {
    let origin = Origin::start(sample_jpeg(200, 200), Duration::from_millis(200)).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;
    let path = image_path(&origin.url("/photo.jpg"), "w=64&fmt=jpeg");

    let responses = join_all((0..8).map(|_| server.get(&path))).await;

    assert!(responses.iter().all(|r| r.status == 200));
    assert!(responses.windows(2).all(|w| w[0].body == w[1].body));
    assert_eq!(origin.hits(), 1);
}

#[tokio::test]
async fn test_coalescing_works_without_a_cache() {
    let origin = Origin::start(sample_jpeg(200, 200), Duration::from_millis(200)).await;
    let config = CacheConfig {
        backend: CacheBackend::None,
        ..Default::default()
    };
    let server = TestServer::start(&config, true).await;
    let path = image_path(&origin.url("/photo.jpg"), "w=64");

    let responses = join_all((0..5).map(|_| server.get(&path))).await;

    assert!(responses.iter().all(|r| r.status == 200));
    assert_eq!(origin.hits(), 1);
}

#[tokio::test]
async fn test_concurrent_failures_are_shared() {
    let origin = Origin::start(sample_jpeg(10, 10), Duration::from_millis(200)).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;
    let path = image_path(&origin.url("/missing.jpg"), "w=5");

    let responses = join_all((0..4).map(|_| server.get(&path))).await;

    assert!(responses.iter().all(|r| r.status == 502));
    assert_eq!(origin.hits(), 1);

    // Failures are not cached
    server.get(&path).await;
    assert_eq!(origin.hits(), 2);
}
