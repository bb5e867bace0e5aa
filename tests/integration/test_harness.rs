// Test harness: a counting origin server plus an openimg instance wired to it

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use openimg::cache::{build_cache, CacheConfig};
use openimg::coordinator::ImageService;
use openimg::fetch::{FetchConfig, HttpFetcher};
use openimg::image_optimizer::StandardCodec;
use openimg::metrics::ServiceMetrics;
use openimg::server::{self, AppState};

/// Encode a solid-colour JPEG of the given size
pub fn sample_jpeg(width: u32, height: u32) -> Bytes {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 220]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageFormat::Jpeg)
        .expect("encode sample jpeg");
    Bytes::from(buffer.into_inner())
}

/// Origin serving `/photo.jpg` after a short delay; every other path is 404
pub struct Origin {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Origin {
    pub async fn start(body: Bytes, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let counter = Arc::clone(&counter);
                let body = body.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let counter = Arc::clone(&counter);
                        let body = body.clone();
                        async move {
                            counter.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(delay).await;
                            if req.uri().path() == "/photo.jpg" {
                                return Ok::<_, Infallible>(Response::new(Full::new(body)));
                            }
                            let mut response =
                                Response::new(Full::new(Bytes::from_static(b"not found")));
                            *response.status_mut() = StatusCode::NOT_FOUND;
                            Ok(response)
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A running openimg server; stops when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub service: Arc<ImageService>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start(cache: &CacheConfig, coalescing: bool) -> Self {
        let fetcher = HttpFetcher::new(&FetchConfig::default(), 20 * 1024 * 1024).unwrap();
        let service = Arc::new(
            ImageService::new(
                build_cache(cache).await.unwrap(),
                Arc::new(fetcher),
                Arc::new(StandardCodec::new()),
                Arc::new(ServiceMetrics::new().unwrap()),
            )
            .with_coalescing(coalescing),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let state = Arc::new(AppState::new(Arc::clone(&service)));
        tokio::spawn(async move {
            let _ = server::serve(listener, state, async {
                let _ = rx.await;
            })
            .await;
        });

        Self {
            addr,
            service,
            shutdown: Some(tx),
        }
    }

    /// Issue a request with hyper and return status, content type and body
    pub async fn request(
        &self,
        method: &str,
        path_and_query: &str,
    ) -> Result<TestResponse, Box<dyn std::error::Error + Send + Sync>> {
        let stream = TcpStream::connect(self.addr).await?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                eprintln!("Connection failed: {:?}", err);
            }
        });

        let req = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("Host", self.addr.to_string())
            .body(Full::new(Bytes::new()))?;
        let res = sender.send_request(req).await?;

        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.into_body().collect().await?.to_bytes();
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, path_and_query: &str) -> TestResponse {
        self.request("GET", path_and_query)
            .await
            .expect("request failed")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub struct TestResponse {
    pub status: u16,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

/// Build `/api/image?url=...&extra` with the url percent-encoded
pub fn image_path(url: &str, extra: &str) -> String {
    let mut path = format!("/api/image?url={}", urlencoding::encode(url));
    if !extra.is_empty() {
        path.push('&');
        path.push_str(extra);
    }
    path
}
