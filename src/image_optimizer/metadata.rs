//! Image metadata extraction
//!
//! Reads dimensions and format from the image header without decoding pixel
//! data, plus a short EXIF summary when the container carries one.

use image::io::Reader as ImageReader;
use serde::Serialize;
use std::io::Cursor;

use super::error::ImageError;

/// Basic facts about a source image, serialized as the metadata response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Short format name, e.g. "jpeg"
    pub format: String,
    pub mime_type: String,
    /// width / height
    pub aspect_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifSummary>,
}

/// Subset of EXIF tags worth exposing to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time_original: Option<String>,
}

impl ExifSummary {
    fn is_empty(&self) -> bool {
        self == &ExifSummary::default()
    }
}

/// Extract metadata from encoded image bytes
pub fn extract_metadata(data: &[u8]) -> Result<ImageMetadata, ImageError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::metadata_failed(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| ImageError::metadata_failed("unrecognized image format"))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ImageError::metadata_failed(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(ImageError::metadata_failed("image has zero dimension"));
    }

    let name = format_name(format);
    Ok(ImageMetadata {
        width,
        height,
        format: name.to_string(),
        mime_type: format!("image/{}", name),
        aspect_ratio: width as f64 / height as f64,
        exif: read_exif_summary(data),
    })
}

fn format_name(format: image::ImageFormat) -> &'static str {
    match format {
        image::ImageFormat::Jpeg => "jpeg",
        image::ImageFormat::Png => "png",
        image::ImageFormat::Gif => "gif",
        image::ImageFormat::WebP => "webp",
        image::ImageFormat::Avif => "avif",
        image::ImageFormat::Bmp => "bmp",
        image::ImageFormat::Tiff => "tiff",
        _ => "unknown",
    }
}

/// EXIF is optional; any parse failure just means no summary
fn read_exif_summary(data: &[u8]) -> Option<ExifSummary> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;

    let ascii = |tag: exif::Tag| -> Option<String> {
        let field = exif.get_field(tag, exif::In::PRIMARY)?;
        match field.value {
            exif::Value::Ascii(ref parts) => parts
                .first()
                .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    };

    let summary = ExifSummary {
        make: ascii(exif::Tag::Make),
        model: ascii(exif::Tag::Model),
        orientation: exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0)),
        date_time_original: ascii(exif::Tag::DateTimeOriginal),
    };

    if summary.is_empty() {
        None
    } else {
        Some(summary)
    }
}
