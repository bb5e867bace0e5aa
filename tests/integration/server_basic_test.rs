// End-to-end HTTP behaviour of the /api/image, /health and /metrics routes

use std::time::Duration;

use super::test_harness::{image_path, sample_jpeg, Origin, TestServer};
use openimg::cache::CacheConfig;

#[tokio::test]
async fn test_transform_resizes_and_converts() {
    let origin = Origin::start(sample_jpeg(300, 200), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;

    let res = server
        .get(&image_path(&origin.url("/photo.jpg"), "w=150&fmt=png"))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.content_type(), "image/png");
    let img = image::load_from_memory(&res.body).unwrap();
    assert_eq!((img.width(), img.height()), (150, 100));
}

#[tokio::test]
async fn test_cover_fit_produces_exact_box() {
    let origin = Origin::start(sample_jpeg(300, 200), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;

    let res = server
        .get(&image_path(
            &origin.url("/photo.jpg"),
            "w=100&h=100&fit=cover&fmt=jpeg",
        ))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.content_type(), "image/jpeg");
    let img = image::load_from_memory(&res.body).unwrap();
    assert_eq!((img.width(), img.height()), (100, 100));
}

#[tokio::test]
async fn test_unspecified_format_keeps_source_format() {
    let origin = Origin::start(sample_jpeg(64, 64), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;

    let res = server.get(&image_path(&origin.url("/photo.jpg"), "w=32")).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.content_type(), "image/jpeg");
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected_without_fetching() {
    let origin = Origin::start(sample_jpeg(64, 64), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;

    for extra in ["w=0&h=3000", "q=101", "fmt=tiff", "fit=squash", "w=abc"] {
        let res = server
            .get(&image_path(&origin.url("/photo.jpg"), extra))
            .await;
        assert_eq!(res.status, 400, "expected 400 for {}", extra);
        let json: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(json["status"], 400);
    }

    let res = server.get("/api/image?url=ftp%3A%2F%2Fexample.com%2Fa.jpg").await;
    assert_eq!(res.status, 400);
    let res = server.get("/api/image").await;
    assert_eq!(res.status, 400);

    assert_eq!(origin.hits(), 0);
}

#[tokio::test]
async fn test_upstream_404_is_bad_gateway() {
    let origin = Origin::start(sample_jpeg(64, 64), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;

    let res = server
        .get(&image_path(&origin.url("/gone.jpg"), "w=10"))
        .await;
    assert_eq!(res.status, 502);
}

#[tokio::test]
async fn test_metadata_and_placeholder_modes() {
    let origin = Origin::start(sample_jpeg(120, 60), Duration::ZERO).await;
    let server = TestServer::start(&CacheConfig::default(), true).await;

    let res = server
        .get(&image_path(&origin.url("/photo.jpg"), "metadata=true"))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type(), "application/json");
    let json: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(json["width"], 120);
    assert_eq!(json["height"], 60);
    assert_eq!(json["format"], "jpeg");

    let res = server
        .get(&image_path(&origin.url("/photo.jpg"), "placeholder=true"))
        .await;
    assert_eq!(res.status, 200);
    assert!(res.content_type().starts_with("text/plain"));
    assert!(res.body.starts_with(b"data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_cors_and_method_handling() {
    let server = TestServer::start(&CacheConfig::default(), true).await;

    let res = server.request("OPTIONS", "/api/image").await.unwrap();
    assert_eq!(res.status, 204);
    assert_eq!(res.headers["access-control-allow-origin"], "*");
    assert_eq!(res.headers["access-control-allow-methods"], "GET, OPTIONS");

    let res = server.request("DELETE", "/api/image").await.unwrap();
    assert_eq!(res.status, 405);
    assert_eq!(res.headers["access-control-allow-origin"], "*");

    let res = server.get("/unknown").await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let server = TestServer::start(&CacheConfig::default(), true).await;

    let res = server.get("/health").await;
    assert_eq!(res.status, 200);
    let json: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(json["status"], "healthy");

    let res = server.get("/metrics").await;
    assert_eq!(res.status, 200);
    let text = String::from_utf8(res.body.to_vec()).unwrap();
    assert!(text.contains("# TYPE openimg_requests_total counter"));
}
