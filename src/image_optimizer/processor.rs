//! Image processing implementation
//!
//! Handles the actual image transformation: decode → resize/crop → encode.
//! All of it is CPU-bound and synchronous; async callers run it on the
//! blocking pool.

use base64::Engine as _;
use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::encoder::{EncoderFactory, EncoderQuality};
use super::error::ImageError;
use super::metadata::{extract_metadata, ImageMetadata};
use super::params::{FitMode, OutputFormat, MAX_DIMENSION};

/// Placeholder width when the caller leaves it at 0
pub const PLACEHOLDER_DEFAULT_WIDTH: u32 = 40;

/// Placeholder JPEG quality when the caller leaves it at 0
pub const PLACEHOLDER_DEFAULT_QUALITY: u8 = 20;

const PLACEHOLDER_PREFIX: &str = "data:image/jpeg;base64,";

/// A decoded source image plus the container format it came in
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub source_format: image::ImageFormat,
}

impl DecodedImage {
    /// Output format to use when the caller did not request one
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_source(Some(self.source_format))
    }
}

/// Fully resolved transform options; format and quality are always set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// 0 means "derive from the other axis" (or keep, if both are 0)
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: u8,
    pub fit: Option<FitMode>,
}

/// Placeholder options; zero values select the defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderOptions {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

/// Decode, transform, placeholder and metadata operations over raw bytes.
///
/// The coordinator only talks to this trait so tests can count calls and
/// inject failures without real images.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, ImageError>;

    fn transform(
        &self,
        image: &DecodedImage,
        options: &TransformOptions,
    ) -> Result<Vec<u8>, ImageError>;

    /// Tiny low-quality JPEG as a `data:` URI
    fn placeholder(
        &self,
        image: &DecodedImage,
        options: &PlaceholderOptions,
    ) -> Result<String, ImageError>;

    fn metadata(&self, data: &[u8]) -> Result<ImageMetadata, ImageError>;
}

/// Production codec: `image` for decode/encode, fast_image_resize for scaling
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCodec;

impl StandardCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for StandardCodec {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, ImageError> {
        decode_image(data)
    }

    fn transform(
        &self,
        image: &DecodedImage,
        options: &TransformOptions,
    ) -> Result<Vec<u8>, ImageError> {
        let img = &image.image;
        let plan = plan_resize(
            (img.width(), img.height()),
            (options.width, options.height),
            options.fit,
        );

        let source = match plan.crop_source {
            Some((x, y, w, h)) => img.crop_imm(x, y, w, h),
            None => img.clone(),
        };

        let output = if plan.resize_to != (source.width(), source.height()) {
            resize_image(&source, plan.resize_to.0, plan.resize_to.1)?
        } else {
            source
        };

        encode(&output, options.format, options.quality)
    }

    fn placeholder(
        &self,
        image: &DecodedImage,
        options: &PlaceholderOptions,
    ) -> Result<String, ImageError> {
        let img = &image.image;
        let width = if options.width == 0 {
            PLACEHOLDER_DEFAULT_WIDTH
        } else {
            options.width
        };
        let (width, height) = if options.height == 0 {
            within_limit((width, scale_axis(width, img.height(), img.width())))
        } else {
            (width, options.height)
        };
        let quality = if options.quality == 0 {
            PLACEHOLDER_DEFAULT_QUALITY
        } else {
            options.quality
        };

        let resized = resize_image(img, width, height)?;
        let jpeg = encode(&resized, OutputFormat::Jpeg, quality)?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);
        Ok(format!("{}{}", PLACEHOLDER_PREFIX, encoded))
    }

    fn metadata(&self, data: &[u8]) -> Result<ImageMetadata, ImageError> {
        extract_metadata(data)
    }
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8]) -> Result<DecodedImage, ImageError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;

    let source_format = reader
        .format()
        .ok_or_else(|| ImageError::decode_failed("unrecognized image format"))?;

    let image = reader
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;

    Ok(DecodedImage {
        image,
        source_format,
    })
}

fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, ImageError> {
    let encoder = EncoderFactory::create(format);
    let rgba = img.to_rgba8();
    let encoded = encoder.encode(
        rgba.as_raw(),
        rgba.width(),
        rgba.height(),
        EncoderQuality::with_quality(quality),
    )?;
    Ok(encoded.data)
}

/// Geometry of a transform: optionally center-crop the source, then scale
/// to `resize_to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResizePlan {
    /// `(x, y, width, height)` region of the source to keep
    crop_source: Option<(u32, u32, u32, u32)>,
    resize_to: (u32, u32),
}

/// `target * numerator / denominator`, rounded, at least 1
fn scale_axis(target: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (target as f64 * numerator as f64 / denominator.max(1) as f64).round();
    (scaled as u32).max(1)
}

fn scale_by(src: (u32, u32), factor: f64) -> (u32, u32) {
    (
        ((src.0 as f64 * factor).round() as u32).max(1),
        ((src.1 as f64 * factor).round() as u32).max(1),
    )
}

/// Shrink `size` proportionally until neither axis exceeds `MAX_DIMENSION`.
///
/// A derived axis can otherwise grow without bound on extreme aspect ratios
/// (a 1x2000 source at width 2000 would ask for 4,000,000 rows).
fn within_limit(size: (u32, u32)) -> (u32, u32) {
    let limit = MAX_DIMENSION as u32;
    if size.0 <= limit && size.1 <= limit {
        return size;
    }
    let factor = (limit as f64 / size.0 as f64).min(limit as f64 / size.1 as f64);
    let (w, h) = scale_by(size, factor);
    (w.min(limit), h.min(limit))
}

/// Largest centered region of `src` with the aspect ratio of `target`
fn cover_region(src: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (src_w, src_h) = src;
    let (w, h) = target;
    let (crop_w, crop_h) = if src_w as u64 * h as u64 > src_h as u64 * w as u64 {
        // Source is wider than the box
        (scale_axis(src_h, w, h).min(src_w), src_h)
    } else {
        (src_w, scale_axis(src_w, h, w).min(src_h))
    };
    ((src_w - crop_w) / 2, (src_h - crop_h) / 2, crop_w, crop_h)
}

/// Work out output geometry for a source size, requested size and fit mode.
/// No planned axis exceeds `MAX_DIMENSION`.
fn plan_resize(src: (u32, u32), target: (u32, u32), fit: Option<FitMode>) -> ResizePlan {
    let (src_w, src_h) = src;
    let (width, height) = target;

    let plain = |resize_to| ResizePlan {
        crop_source: None,
        resize_to: within_limit(resize_to),
    };

    match (width, height) {
        (0, 0) => plain(src),
        // One axis given: keep the aspect ratio
        (w, 0) => {
            let w = if fit == Some(FitMode::Inside) { w.min(src_w) } else { w };
            plain((w, scale_axis(w, src_h, src_w)))
        }
        (0, h) => {
            let h = if fit == Some(FitMode::Inside) { h.min(src_h) } else { h };
            plain((scale_axis(h, src_w, src_h), h))
        }
        (w, h) => {
            let sx = w as f64 / src_w.max(1) as f64;
            let sy = h as f64 / src_h.max(1) as f64;
            match fit {
                None | Some(FitMode::Fill) => plain((w, h)),
                Some(FitMode::Contain) => plain(scale_by(src, sx.min(sy))),
                Some(FitMode::Inside) => plain(scale_by(src, sx.min(sy).min(1.0))),
                Some(FitMode::Outside) => plain(scale_by(src, sx.max(sy))),
                Some(FitMode::Cover) => {
                    let region = cover_region(src, (w, h));
                    ResizePlan {
                        crop_source: (region != (0, 0, src_w, src_h)).then_some(region),
                        resize_to: within_limit((w, h)),
                    }
                }
            }
        }
    }
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(img: &DynamicImage, target_w: u32, target_h: u32) -> Result<DynamicImage, ImageError> {
    let src_w = img.width();
    let src_h = img.height();

    let src_width =
        NonZeroU32::new(src_w).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height =
        NonZeroU32::new(src_h).ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let result_buf = dst_image.into_vec();
    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, result_buf)
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
