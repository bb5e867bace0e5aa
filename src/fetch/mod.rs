//! Upstream image fetching.
//!
//! The coordinator only depends on the [`ImageFetcher`] trait; [`HttpFetcher`]
//! is the production implementation over a shared `reqwest::Client`.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while retrieving source bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to upstream failed: {message}")]
    Request { message: String },

    #[error("upstream responded with status {status}")]
    Status { status: u16 },

    #[error("upstream body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to read upstream body: {message}")]
    Body { message: String },
}

impl FetchError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Request { .. } => "request",
            FetchError::Status { .. } => "status",
            FetchError::TooLarge { .. } => "too_large",
            FetchError::Body { .. } => "body",
        }
    }
}

/// Retrieves the raw bytes behind a source URL
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("openimg/{}", env!("CARGO_PKG_VERSION"))
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_seconds == 0 {
            return Err("fetch.timeout_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// HTTP(S) fetcher with a request timeout and a body size cap
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Build the shared HTTP client.
    ///
    /// Fails only if the client itself cannot be constructed (TLS backend
    /// initialisation).
    pub fn new(config: &FetchConfig, max_body_bytes: u64) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }

        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge { limit });
        }

        // Content-Length may be absent or wrong, so enforce while streaming
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Body {
            message: e.to_string(),
        })? {
            if body.len() as u64 + chunk.len() as u64 > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, bytes = body.len(), "Fetched upstream image");
        Ok(body.freeze())
    }
}
