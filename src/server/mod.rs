// Server module - hyper HTTP surface over ImageService
//
// Routes:
// - GET /api/image?url=&w=&h=&q=&fmt=&fit=   transformed image
//   (&metadata=true for JSON metadata, &placeholder=true for a data: URI)
// - GET /health                              liveness JSON
// - GET /metrics                             Prometheus text
//
// Routing is a plain async function over (method, path, query) so it can be
// tested without sockets; `serve` only adds the accept loop.

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::coordinator::{ImageService, PLACEHOLDER_CONTENT_TYPE};
use crate::error::ServiceError;
use crate::image_optimizer::{PlaceholderParams, TransformParams, ValidationError};

pub const IMAGE_PATH: &str = "/api/image";
pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

const JSON_CONTENT_TYPE: &str = "application/json";
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub type HttpResponse = Response<Full<Bytes>>;

/// Shared state for all connections
pub struct AppState {
    service: Arc<ImageService>,
    started: Instant,
}

impl AppState {
    pub fn new(service: Arc<ImageService>) -> Self {
        Self {
            service,
            started: Instant::now(),
        }
    }
}

/// Accept connections until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        };

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |req| handle(Arc::clone(&state), req));
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        });
    }
}

async fn handle(state: Arc<AppState>, req: Request<Incoming>) -> Result<HttpResponse, Infallible> {
    let started = Instant::now();
    let response = route(&state, req.method(), req.uri().path(), req.uri().query()).await;

    tracing::info!(
        method = %req.method(),
        path = %req.uri().path(),
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );
    Ok(response)
}

/// Dispatch one request. Every response carries the CORS headers.
pub async fn route(
    state: &AppState,
    method: &Method,
    path: &str,
    query: Option<&str>,
) -> HttpResponse {
    let allowed = [IMAGE_PATH, HEALTH_PATH, METRICS_PATH].contains(&path);
    let response = if !allowed {
        error_response(StatusCode::NOT_FOUND, "Not found")
    } else if path == IMAGE_PATH && method == Method::OPTIONS {
        respond(StatusCode::NO_CONTENT, None, Bytes::new())
    } else if method != Method::GET {
        error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        match path {
            HEALTH_PATH => health(state),
            METRICS_PATH => metrics(state),
            _ => serve_image(state, &parse_query(query.unwrap_or(""))).await,
        }
    };
    with_cors(response)
}

async fn serve_image(state: &AppState, query: &HashMap<String, String>) -> HttpResponse {
    let get = |name: &str| query.get(name).cloned().unwrap_or_default();
    let url = get("url");

    if get("metadata") == "true" {
        return match state.service.serve_metadata(&url).await {
            Ok(meta) => match serde_json::to_vec(&meta) {
                Ok(body) => respond(StatusCode::OK, Some(JSON_CONTENT_TYPE), Bytes::from(body)),
                Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            },
            Err(e) => service_error_response(&e),
        };
    }

    let numbers = match (
        parse_int(query, "w"),
        parse_int(query, "h"),
        parse_int(query, "q"),
    ) {
        (Ok(w), Ok(h), Ok(q)) => (w, h, q),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            return service_error_response(&ServiceError::Validation(e))
        }
    };
    let (width, height, quality) = numbers;

    if get("placeholder") == "true" {
        let params = PlaceholderParams {
            url,
            width,
            height,
            quality,
        };
        return match state.service.serve_placeholder(&params).await {
            Ok(data) => respond(StatusCode::OK, Some(PLACEHOLDER_CONTENT_TYPE), data),
            Err(e) => service_error_response(&e),
        };
    }

    let params = TransformParams::new(url)
        .with_size(width, height)
        .with_quality(quality)
        .with_format(get("fmt"))
        .with_fit(get("fit"));

    match state.service.serve(&params).await {
        Ok(served) => respond(StatusCode::OK, Some(served.content_type), served.data),
        Err(e) => service_error_response(&e),
    }
}

fn health(state: &AppState) -> HttpResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "cache_backend": state.service.cache().backend(),
    })
    .to_string();
    respond(StatusCode::OK, Some(JSON_CONTENT_TYPE), Bytes::from(body))
}

fn metrics(state: &AppState) -> HttpResponse {
    match state.service.metrics().export_prometheus() {
        Ok(text) => respond(StatusCode::OK, Some(PROMETHEUS_CONTENT_TYPE), Bytes::from(text)),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Decode `a=1&b=x%20y` into a map. Later duplicates win.
fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Absent or empty numeric parameters mean 0
fn parse_int(query: &HashMap<String, String>, name: &str) -> Result<i64, ValidationError> {
    match query.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| ValidationError::MalformedParameter {
                param: name.to_string(),
                value: value.to_string(),
            }),
    }
}

fn respond(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({
        "error": message,
        "status": status.as_u16(),
    })
    .to_string();
    respond(status, Some(JSON_CONTENT_TYPE), Bytes::from(body))
}

fn service_error_response(err: &ServiceError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, &err.to_string())
}

fn with_cors(mut response: HttpResponse) -> HttpResponse {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Accept, Content-Type"),
    );
    response
}
