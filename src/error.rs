// Error types module

use thiserror::Error;

use crate::fetch::FetchError;
use crate::image_optimizer::{ImageError, ValidationError};

/// Error returned by every `ImageService` operation
///
/// `Clone` so a single in-flight failure can be handed to every coalesced
/// waiter. Errors are never written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Caller-supplied parameters failed validation
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Source bytes could not be retrieved
    #[error("failed to fetch source image: {0}")]
    UpstreamFetch(#[from] FetchError),

    /// Source bytes are not a decodable image
    #[error("unsupported source image: {0}")]
    UnsupportedSourceImage(ImageError),

    /// Resize or encode failed
    #[error("image transformation failed: {0}")]
    Transform(ImageError),

    /// Header/EXIF extraction failed
    #[error("failed to read image metadata: {0}")]
    Metadata(ImageError),

    /// Unexpected failure (e.g. a blocking task panicked)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// True when the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }

    /// Maps service errors to HTTP status codes
    ///
    /// Status mapping:
    /// - Validation → 400 (Bad Request)
    /// - UpstreamFetch → 502 (Bad Gateway)
    /// - UnsupportedSourceImage, Metadata → 422 (Unprocessable Entity)
    /// - Transform, Internal → 500 (Internal Server Error)
    pub fn to_http_status(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::UpstreamFetch(_) => 502,
            ServiceError::UnsupportedSourceImage(_) => 422,
            ServiceError::Transform(_) => 500,
            ServiceError::Metadata(_) => 422,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::UpstreamFetch(_) => "upstream_fetch",
            ServiceError::UnsupportedSourceImage(_) => "unsupported_source",
            ServiceError::Transform(_) => "transform",
            ServiceError::Metadata(_) => "metadata",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Internal(format!("blocking task failed: {}", err))
    }
}
