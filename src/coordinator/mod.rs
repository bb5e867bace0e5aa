//! Request coordination
//!
//! `ImageService` drives one request end to end: validate, derive the cache
//! key, try the cache, and on a miss fetch, decode and transform exactly once
//! per key no matter how many identical requests arrive together. Results are
//! stored best-effort; a failing cache degrades to recomputation, never to an
//! error.

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;

use crate::cache::{derive_key, Cache, CacheKey, RequestKind};
use crate::error::ServiceError;
use crate::fetch::ImageFetcher;
use crate::image_optimizer::{
    validate_url, ImageCodec, ImageMetadata, NormalizedRequest, OutputFormat, PlaceholderOptions,
    PlaceholderParams, TransformOptions, TransformParams,
};
use crate::metrics::ServiceMetrics;
use crate::request_coalescing::{CoalescingSlot, RequestCoalescer};


/// Content type of placeholder responses (a `data:` URI as text)
pub const PLACEHOLDER_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Quality applied when a transform request leaves quality at 0
pub const DEFAULT_QUALITY: u8 = 85;

/// Transformed image bytes and the content type to serve them with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedImage {
    pub data: Bytes,
    pub content_type: &'static str,
}

type Outcome = Result<ServedImage, ServiceError>;

/// What a cached entry holds, used to pick its content type on a hit
#[derive(Debug, Clone, Copy)]
enum Variant {
    Transform(Option<OutputFormat>),
    Placeholder,
}

impl Variant {
    fn content_type(&self, data: &[u8]) -> &'static str {
        match self {
            Variant::Transform(Some(format)) => format.content_type(),
            // Source format was adopted at transform time; recover it from the bytes
            Variant::Transform(None) => {
                OutputFormat::from_source(image::guess_format(data).ok()).content_type()
            }
            Variant::Placeholder => PLACEHOLDER_CONTENT_TYPE,
        }
    }
}

/// Image request coordinator
pub struct ImageService {
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn ImageFetcher>,
    codec: Arc<dyn ImageCodec>,
    metrics: Arc<ServiceMetrics>,
    coalescer: Option<RequestCoalescer<Outcome>>,
    default_quality: u8,
}

impl ImageService {
    /// Create a service with coalescing enabled and the default quality
    pub fn new(
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn ImageFetcher>,
        codec: Arc<dyn ImageCodec>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            codec,
            metrics,
            coalescer: Some(RequestCoalescer::new()),
            default_quality: DEFAULT_QUALITY,
        }
    }

    /// Quality used when a transform request leaves quality at 0
    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }

    /// Enable or disable single-flight deduplication of identical misses
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalescer = enabled.then(RequestCoalescer::new);
        self
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    /// Serve a transformed variant of a source image
    pub async fn serve(&self, params: &TransformParams) -> Result<ServedImage, ServiceError> {
        self.metrics.record_request("transform");
        let result = self.serve_transform(params).await;
        self.record_outcome(&params.url, &result);
        result
    }

    /// Serve a low-quality placeholder as a `data:image/jpeg;base64,...` string
    pub async fn serve_placeholder(&self, params: &PlaceholderParams) -> Result<Bytes, ServiceError> {
        self.metrics.record_request("placeholder");
        let result = self.serve_placeholder_inner(params).await;
        self.record_outcome(&params.url, &result);
        result.map(|served| served.data)
    }

    /// Read dimensions, format and EXIF summary of a source image. Not cached.
    pub async fn serve_metadata(&self, url: &str) -> Result<ImageMetadata, ServiceError> {
        self.metrics.record_request("metadata");
        let result = self.serve_metadata_inner(url).await;
        if let Err(e) = &result {
            self.metrics.record_error(e.kind());
            tracing::warn!(url = %url, error = %e, "Metadata request failed");
        }
        result
    }

    async fn serve_transform(&self, params: &TransformParams) -> Outcome {
        let request = params.validate()?.with_default_quality(self.default_quality);
        let key = derive_key(&request, RequestKind::Transform);
        let variant = Variant::Transform(request.format);

        if let Some(hit) = self.lookup(&key, variant).await {
            return Ok(hit);
        }

        self.coalesced(&key, variant, || self.transform_miss(&request, &key))
            .await
    }

    async fn serve_placeholder_inner(&self, params: &PlaceholderParams) -> Outcome {
        // Quality 0 stays 0 in the key; the codec applies the placeholder default
        let request = params.validate()?;
        let key = derive_key(&request, RequestKind::Placeholder);
        let variant = Variant::Placeholder;

        if let Some(hit) = self.lookup(&key, variant).await {
            return Ok(hit);
        }

        self.coalesced(&key, variant, || self.placeholder_miss(&request, &key))
            .await
    }

    async fn serve_metadata_inner(&self, url: &str) -> Result<ImageMetadata, ServiceError> {
        validate_url(url)?;
        let source = self.fetch(url).await?;

        let codec = Arc::clone(&self.codec);
        let timer = self.metrics.start_processing_timer("metadata");
        let metadata = tokio::task::spawn_blocking(move || codec.metadata(&source))
            .await?
            .map_err(ServiceError::Metadata)?;
        timer.observe_duration();

        Ok(metadata)
    }

    /// Run `produce` once per key across concurrent callers.
    ///
    /// The leader re-checks the cache first: an identical request may have
    /// finished between our miss and acquiring the slot. The re-check does not
    /// count as a second miss.
    async fn coalesced<F, Fut>(&self, key: &CacheKey, variant: Variant, produce: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let Some(coalescer) = &self.coalescer else {
            return produce().await;
        };

        match coalescer.acquire(key).await {
            CoalescingSlot::Leader(guard) => {
                let result = match self.read(key, variant, false).await {
                    Some(hit) => Ok(hit),
                    None => produce().await,
                };
                guard.complete(result.clone());
                result
            }
            CoalescingSlot::Follower(result) => {
                self.metrics.record_coalesced_wait();
                tracing::debug!(key = %key, "Served by in-flight request");
                result
            }
        }
    }

    async fn transform_miss(&self, request: &NormalizedRequest, key: &CacheKey) -> Outcome {
        let source = self.fetch(&request.url).await?;

        let codec = Arc::clone(&self.codec);
        let (width, height, quality, fit) =
            (request.width, request.height, request.quality, request.fit);
        let requested = request.format;

        let timer = self.metrics.start_processing_timer("transform");
        let (data, format) = tokio::task::spawn_blocking(move || {
            let decoded = codec
                .decode(&source)
                .map_err(ServiceError::UnsupportedSourceImage)?;
            let format = requested.unwrap_or_else(|| decoded.output_format());
            let options = TransformOptions {
                width,
                height,
                format,
                quality,
                fit,
            };
            let data = codec
                .transform(&decoded, &options)
                .map_err(ServiceError::Transform)?;
            Ok::<_, ServiceError>((data, format))
        })
        .await??;
        timer.observe_duration();

        let data = Bytes::from(data);
        self.store(key, data.clone()).await;

        Ok(ServedImage {
            data,
            content_type: format.content_type(),
        })
    }

    async fn placeholder_miss(&self, request: &NormalizedRequest, key: &CacheKey) -> Outcome {
        let source = self.fetch(&request.url).await?;

        let codec = Arc::clone(&self.codec);
        let options = PlaceholderOptions {
            width: request.width,
            height: request.height,
            quality: request.quality,
        };

        let timer = self.metrics.start_processing_timer("placeholder");
        let uri = tokio::task::spawn_blocking(move || {
            let decoded = codec
                .decode(&source)
                .map_err(ServiceError::UnsupportedSourceImage)?;
            codec
                .placeholder(&decoded, &options)
                .map_err(ServiceError::Transform)
        })
        .await??;
        timer.observe_duration();

        let data = Bytes::from(uri);
        self.store(key, data.clone()).await;

        Ok(ServedImage {
            data,
            content_type: PLACEHOLDER_CONTENT_TYPE,
        })
    }

    /// Cache read; errors are logged and treated as a miss
    async fn lookup(&self, key: &CacheKey, variant: Variant) -> Option<ServedImage> {
        self.read(key, variant, true).await
    }

    async fn read(&self, key: &CacheKey, variant: Variant, count_miss: bool) -> Option<ServedImage> {
        match self.cache.get(key).await {
            Ok(Some(data)) => {
                self.metrics.record_cache_hit();
                tracing::debug!(key = %key, backend = self.cache.backend(), "Cache hit");
                let content_type = variant.content_type(&data);
                Some(ServedImage { data, content_type })
            }
            Ok(None) => {
                if count_miss {
                    self.metrics.record_cache_miss();
                }
                None
            }
            Err(e) => {
                self.metrics.record_cache_error();
                tracing::warn!(
                    key = %key,
                    backend = self.cache.backend(),
                    error = %e,
                    "Cache read failed, treating as miss"
                );
                None
            }
        }
    }

    /// Cache write; failures never fail the request
    async fn store(&self, key: &CacheKey, data: Bytes) {
        if let Err(e) = self.cache.set(key.clone(), data).await {
            self.metrics.record_cache_write_failure();
            tracing::warn!(
                key = %key,
                backend = self.cache.backend(),
                error = %e,
                "Failed to store result in cache"
            );
        }
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, ServiceError> {
        self.metrics.record_upstream_fetch();
        self.fetcher.fetch(url).await.map_err(|e| {
            self.metrics.record_upstream_error(e.kind());
            ServiceError::from(e)
        })
    }

    fn record_outcome<T>(&self, url: &str, result: &Result<T, ServiceError>) {
        if let Err(e) = result {
            self.metrics.record_error(e.kind());
            if e.is_client_error() {
                tracing::debug!(url = %url, error = %e, "Rejected request");
            } else {
                tracing::warn!(url = %url, error = %e, "Request failed");
            }
        }
    }
}
