//! Image optimization module
//!
//! Provides the image side of the pipeline:
//! - Parameter validation into a [`NormalizedRequest`]
//! - Decode, resize with fit modes, and re-encode (JPEG, PNG, WebP, AVIF)
//! - Low-quality placeholders as `data:` URIs
//! - Header metadata with an optional EXIF summary
//!
//! # Query Parameters
//!
//! ```text
//! /api/image?url=https://host/photo.jpg&w=800&h=600&q=80&fmt=webp&fit=cover
//! ```

// Core modules
pub mod config;
pub mod encoder;
pub mod error;
pub mod metadata;
pub mod params;
pub mod processor;

// Re-export commonly used types
pub use config::ImageConfig;
pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::{ImageError, ValidationError};
pub use metadata::{extract_metadata, ExifSummary, ImageMetadata};
pub use params::{
    validate, validate_url, FitMode, NormalizedRequest, OutputFormat, PlaceholderParams,
    TransformParams,
};
pub use processor::{
    DecodedImage, ImageCodec, PlaceholderOptions, StandardCodec, TransformOptions,
};
