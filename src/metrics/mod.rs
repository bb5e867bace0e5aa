// Metrics module - Prometheus metrics for the image pipeline
//
// Every `ServiceMetrics` owns its own registry, so tests and multiple service
// instances never share counters.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Counters and histograms for the request pipeline
pub struct ServiceMetrics {
    registry: Registry,

    /// Requests by operation (transform, placeholder, metadata)
    requests: IntCounterVec,

    /// Failed requests by error kind
    request_errors: IntCounterVec,

    /// Cache lookups by result (hit, miss, error)
    cache_lookups: IntCounterVec,

    /// Cache writes that failed and were skipped
    cache_write_failures: IntCounter,

    /// Requests that waited on an identical in-flight request
    coalesced_waits: IntCounter,

    /// Upstream fetches attempted
    upstream_fetches: IntCounter,

    /// Upstream failures by kind
    upstream_errors: IntCounterVec,

    /// Decode + transform duration by operation
    processing_duration: HistogramVec,
}

impl ServiceMetrics {
    /// Create and register all metrics on a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("openimg_requests_total", "Total number of requests by operation"),
            &["operation"],
        )?;
        let request_errors = IntCounterVec::new(
            Opts::new(
                "openimg_request_errors_total",
                "Total number of failed requests by error kind",
            ),
            &["kind"],
        )?;
        let cache_lookups = IntCounterVec::new(
            Opts::new(
                "openimg_cache_lookups_total",
                "Total number of cache lookups by result",
            ),
            &["result"], // hit, miss, error
        )?;
        let cache_write_failures = IntCounter::new(
            "openimg_cache_write_failures_total",
            "Total number of cache writes that failed",
        )?;
        let coalesced_waits = IntCounter::new(
            "openimg_coalesced_waits_total",
            "Total number of requests served by an identical in-flight request",
        )?;
        let upstream_fetches = IntCounter::new(
            "openimg_upstream_fetches_total",
            "Total number of upstream fetches",
        )?;
        let upstream_errors = IntCounterVec::new(
            Opts::new(
                "openimg_upstream_errors_total",
                "Total number of upstream fetch failures by kind",
            ),
            &["kind"],
        )?;
        let processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "openimg_processing_duration_seconds",
                "Duration of decode and transform work in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), // 1ms to 5s
            &["operation"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(request_errors.clone()))?;
        registry.register(Box::new(cache_lookups.clone()))?;
        registry.register(Box::new(cache_write_failures.clone()))?;
        registry.register(Box::new(coalesced_waits.clone()))?;
        registry.register(Box::new(upstream_fetches.clone()))?;
        registry.register(Box::new(upstream_errors.clone()))?;
        registry.register(Box::new(processing_duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            request_errors,
            cache_lookups,
            cache_write_failures,
            coalesced_waits,
            upstream_fetches,
            upstream_errors,
            processing_duration,
        })
    }

    pub fn record_request(&self, operation: &str) {
        self.requests.with_label_values(&[operation]).inc();
    }

    pub fn record_error(&self, kind: &str) {
        self.request_errors.with_label_values(&[kind]).inc();
    }

    pub fn record_cache_hit(&self) {
        self.cache_lookups.with_label_values(&["hit"]).inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_lookups.with_label_values(&["miss"]).inc();
    }

    pub fn record_cache_error(&self) {
        self.cache_lookups.with_label_values(&["error"]).inc();
    }

    pub fn record_cache_write_failure(&self) {
        self.cache_write_failures.inc();
    }

    pub fn record_coalesced_wait(&self) {
        self.coalesced_waits.inc();
    }

    pub fn record_upstream_fetch(&self) {
        self.upstream_fetches.inc();
    }

    pub fn record_upstream_error(&self, kind: &str) {
        self.upstream_errors.with_label_values(&[kind]).inc();
    }

    /// Start timing decode/transform work
    ///
    /// The duration is recorded when the timer is observed or dropped.
    pub fn start_processing_timer(&self, operation: &str) -> HistogramTimer {
        HistogramTimer {
            histogram: Some(self.processing_duration.with_label_values(&[operation])),
            start: std::time::Instant::now(),
        }
    }

    pub fn requests(&self, operation: &str) -> u64 {
        self.requests.with_label_values(&[operation]).get()
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_lookups.with_label_values(&["hit"]).get()
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_lookups.with_label_values(&["miss"]).get()
    }

    pub fn cache_write_failures(&self) -> u64 {
        self.cache_write_failures.get()
    }

    pub fn coalesced_waits(&self) -> u64 {
        self.coalesced_waits.get()
    }

    pub fn upstream_fetches(&self) -> u64 {
        self.upstream_fetches.get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export_prometheus(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// RAII timer for histogram metrics
///
/// Automatically records duration when dropped.
pub struct HistogramTimer {
    histogram: Option<Histogram>,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Manually observe and consume the timer
    pub fn observe_duration(mut self) {
        self.observe();
    }

    fn observe(&mut self) {
        if let Some(histogram) = self.histogram.take() {
            histogram.observe(self.start.elapsed().as_secs_f64());
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.observe();
    }
}
