//! Transformation parameter validation
//!
//! Raw request parameters arrive as loosely-typed values (integers that may
//! be negative, free-form strings). Everything downstream of this module works
//! with a [`NormalizedRequest`], which can only be built through [`validate`].

use std::str::FromStr;

use super::error::ValidationError;

/// Smallest accepted non-zero dimension
pub const MIN_DIMENSION: i64 = 1;

/// Largest accepted dimension on either axis
pub const MAX_DIMENSION: i64 = 2000;

/// Accepted quality range when a quality is given
pub const MIN_QUALITY: i64 = 1;
pub const MAX_QUALITY: i64 = 100;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// Map a decoded source format onto an output format.
    ///
    /// Sources we cannot re-encode in their own format (GIF, BMP, ...) fall
    /// back to PNG, which is also the content type used for them.
    pub fn from_source(format: Option<image::ImageFormat>) -> Self {
        match format {
            Some(image::ImageFormat::Jpeg) => Self::Jpeg,
            Some(image::ImageFormat::WebP) => Self::WebP,
            Some(image::ImageFormat::Avif) => Self::Avif,
            _ => Self::Png,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(ValidationError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// How to reconcile the source aspect ratio with the target dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitMode {
    /// Scale to cover the target box, then center-crop the overflow
    Cover,
    /// Scale to fit within the target box, preserving aspect ratio.
    /// Small sources are enlarged; use `Inside` to keep them as they are.
    Contain,
    /// Stretch to the exact target box (may distort)
    Fill,
    /// Like contain, but never enlarges
    Inside,
    /// Scale to cover the target box without cropping
    Outside,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Fill => "fill",
            Self::Inside => "inside",
            Self::Outside => "outside",
        }
    }
}

impl FromStr for FitMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cover" => Ok(FitMode::Cover),
            "contain" => Ok(FitMode::Contain),
            "fill" => Ok(FitMode::Fill),
            "inside" => Ok(FitMode::Inside),
            "outside" => Ok(FitMode::Outside),
            _ => Err(ValidationError::UnsupportedFit { fit: s.to_string() }),
        }
    }
}

/// Raw parameters for a full transform, as received from the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformParams {
    pub url: String,
    pub width: i64,
    pub height: i64,
    pub quality: i64,
    pub format: String,
    pub fit: String,
}

impl TransformParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: i64, height: i64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_quality(mut self, quality: i64) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_fit(mut self, fit: impl Into<String>) -> Self {
        self.fit = fit.into();
        self
    }
}

/// Raw parameters for a placeholder request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderParams {
    pub url: String,
    pub width: i64,
    pub height: i64,
    pub quality: i64,
}

/// A validated request. Zero width/height means "unconstrained on that axis",
/// zero quality means "use the default".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedRequest {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: Option<OutputFormat>,
    pub fit: Option<FitMode>,
}

impl NormalizedRequest {
    /// Replace an unset quality with `default`
    pub fn with_default_quality(mut self, default: u8) -> Self {
        if self.quality == 0 {
            self.quality = default;
        }
        self
    }
}

/// Validate the source URL: non-empty, absolute, http or https
pub fn validate_url(raw: &str) -> Result<reqwest::Url, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::InvalidUrl {
            reason: "URL is required".to_string(),
        });
    }

    let url = reqwest::Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
        reason: format!("invalid URL format: {}", e),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ValidationError::InvalidUrl {
            reason: format!("URL scheme must be http or https, got {}", other),
        }),
    }
}

fn validate_dimension(param: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value != 0 && !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        return Err(ValidationError::DimensionOutOfRange { param, value });
    }
    Ok(value as u32)
}

fn validate_quality(value: i64) -> Result<u8, ValidationError> {
    if value != 0 && !(MIN_QUALITY..=MAX_QUALITY).contains(&value) {
        return Err(ValidationError::QualityOutOfRange { value });
    }
    Ok(value as u8)
}

/// Validate and normalize transformation parameters.
///
/// Pure: performs no I/O. The URL is checked first so an empty URL always
/// reports `InvalidUrl` regardless of the other parameters.
pub fn validate(
    url: &str,
    width: i64,
    height: i64,
    quality: i64,
    format: &str,
    fit: &str,
) -> Result<NormalizedRequest, ValidationError> {
    validate_url(url)?;

    let width = validate_dimension("width", width)?;
    let height = validate_dimension("height", height)?;
    let quality = validate_quality(quality)?;

    let format = if format.is_empty() {
        None
    } else {
        Some(format.parse::<OutputFormat>()?)
    };

    let fit = if fit.is_empty() {
        None
    } else {
        Some(fit.parse::<FitMode>()?)
    };

    Ok(NormalizedRequest {
        url: url.to_string(),
        width,
        height,
        quality,
        format,
        fit,
    })
}

impl TransformParams {
    pub fn validate(&self) -> Result<NormalizedRequest, ValidationError> {
        validate(
            &self.url,
            self.width,
            self.height,
            self.quality,
            &self.format,
            &self.fit,
        )
    }
}

impl PlaceholderParams {
    pub fn validate(&self) -> Result<NormalizedRequest, ValidationError> {
        validate(&self.url, self.width, self.height, self.quality, "", "")
    }
}
