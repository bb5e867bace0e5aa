//! Image pipeline error types
//!
//! `ValidationError` covers caller-supplied input; `ImageError` covers the
//! decode/transform/encode collaborators.

use std::fmt;
use thiserror::Error;

/// Client errors produced by parameter validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("{param} must be between 1 and 2000, got {value}")]
    DimensionOutOfRange { param: &'static str, value: i64 },

    #[error("quality must be between 1 and 100, got {value}")]
    QualityOutOfRange { value: i64 },

    #[error("unsupported format '{format}': must be one of jpeg, jpg, png, avif, webp")]
    UnsupportedFormat { format: String },

    #[error("unsupported fit '{fit}': must be one of cover, contain, fill, inside, outside")]
    UnsupportedFit { fit: String },

    /// A numeric query parameter that is not an integer
    #[error("parameter '{param}' must be an integer, got '{value}'")]
    MalformedParameter { param: String, value: String },
}

/// Errors that can occur inside the image codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Resize or crop failed
    ResizeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
    /// Header or EXIF extraction failed
    MetadataFailed { message: String },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::MetadataFailed { message } => {
                write!(f, "Failed to read image metadata: {}", message)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn metadata_failed(message: impl Into<String>) -> Self {
        ImageError::MetadataFailed {
            message: message.into(),
        }
    }
}
