//! Image reduction.
//!
//! Turns an uploaded image into a placeholder:
//!
//! 1. Sniff the container format and decode
//! 2. Read the EXIF orientation and rotate/flip accordingly
//! 3. Resize into the target box ("fit inside", or cover-crop for exact sizes).
//!    The box is clamped by the stored dimensions, not the oriented ones.
//! 4. Re-encode as lossy WebP or JPEG at low quality
//! 5. Build the `data:` URI from the encoded bytes
//!
//! Everything happens in memory. The work is CPU-bound and synchronous, so
//! async callers should run it on the blocking pool (see [`super::LqipService`]).

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use serde::Serialize;
use tracing::debug;

use crate::error::LqipError;

use super::options::{EncoderOverrides, LqipOptions, OutputFormat, Resize};

/// Resampling filter used for downscaling.
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

// =============================================================================
// Result Types
// =============================================================================

/// Metadata describing a reduction, serialized as the JSON response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LqipMetadata {
    /// Width of the source image as stored (before orientation)
    pub original_width: u32,

    /// Height of the source image as stored (before orientation)
    pub original_height: u32,

    /// Width of the placeholder
    pub width: u32,

    /// Height of the placeholder
    pub height: u32,

    /// Output format name ("webp", "jpeg" or "jpg")
    #[serde(rename = "type")]
    pub format: String,

    /// `data:image/<type>;base64,<content>`
    #[serde(rename = "dataURIBase64")]
    pub data_uri_base64: String,
}

/// A reduced image: encoded bytes plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LqipImage {
    /// Encoded placeholder bytes
    pub content: Bytes,

    pub metadata: LqipMetadata,
}

// =============================================================================
// Reduction
// =============================================================================

/// Reduce `input` to a placeholder image.
///
/// The output format is already typed here; string formats are validated
/// when parsed into [`OutputFormat`], before any decoding.
///
/// # Errors
///
/// - [`LqipError::Decode`] if the input is not a supported image
/// - [`LqipError::Encode`] if the output codec fails
pub fn compute_lqip_image(input: &[u8], options: &LqipOptions) -> Result<LqipImage, LqipError> {
    let (img, (original_width, original_height)) = decode_oriented(input)?;

    let target = options.resize.target_box(original_width, original_height);
    let resized = resize(&img, options.resize, target);
    let (width, height) = resized.dimensions();

    let format = options.output_format;
    let content = encode(&resized, format, &options.output_options)?;

    debug!(
        original_width,
        original_height,
        width,
        height,
        format = format.as_str(),
        bytes = content.len(),
        "Reduced image"
    );

    let data_uri_base64 = data_uri(format, &content);

    Ok(LqipImage {
        content,
        metadata: LqipMetadata {
            original_width,
            original_height,
            width,
            height,
            format: format.as_str().to_string(),
            data_uri_base64,
        },
    })
}

/// Build a `data:image/<format>;base64,...` URI.
pub fn data_uri(format: OutputFormat, content: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        format.content_type(),
        STANDARD.encode(content)
    )
}

/// Decode an image and apply its EXIF orientation.
///
/// Also returns the stored dimensions, read before orientation is applied.
fn decode_oriented(input: &[u8]) -> Result<(DynamicImage, (u32, u32)), LqipError> {
    let reader = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(LqipError::decode)?;

    let mut decoder = reader.into_decoder().map_err(LqipError::decode)?;
    let stored = decoder.dimensions();

    // Missing or unreadable EXIF just means "no rotation"
    let orientation = decoder
        .orientation()
        .unwrap_or(image::metadata::Orientation::NoTransforms);

    let mut img = DynamicImage::from_decoder(decoder).map_err(LqipError::decode)?;
    img.apply_orientation(orientation);

    Ok((img, stored))
}

/// Resize into `(box_w, box_h)`: fit inside for bounds, cover-crop for exact sizes.
fn resize(img: &DynamicImage, resize: Resize, (box_w, box_h): (u32, u32)) -> DynamicImage {
    match resize {
        Resize::Bound(_) if img.dimensions() == (box_w, box_h) => img.clone(),
        Resize::Bound(_) => img.resize(box_w, box_h, RESIZE_FILTER),
        Resize::Exact { .. } => img.resize_to_fill(box_w, box_h, RESIZE_FILTER),
    }
}

/// Encode with the codec for `format`.
fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    overrides: &EncoderOverrides,
) -> Result<Bytes, LqipError> {
    match format {
        OutputFormat::Webp => encode_webp(img, overrides),
        OutputFormat::Jpeg | OutputFormat::Jpg => encode_jpeg(img, overrides.quality()),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, LqipError> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| LqipError::encode("jpeg", e))?;

    Ok(Bytes::from(output))
}

fn encode_webp(img: &DynamicImage, overrides: &EncoderOverrides) -> Result<Bytes, LqipError> {
    let mut config =
        webp::WebPConfig::new().map_err(|_| LqipError::encode("webp", "invalid encoder config"))?;
    config.lossless = 0;
    config.quality = overrides.quality() as f32;
    config.alpha_quality = overrides.alpha_quality() as i32;
    config.use_sharp_yuv = overrides.smart_subsample() as i32;

    let (width, height) = img.dimensions();
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_advanced(&config)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_advanced(&config)
    };
    let memory = encoded.map_err(|e| LqipError::encode("webp", format!("{:?}", e)))?;

    Ok(Bytes::copy_from_slice(&memory))
}

// =============================================================================
// Tests
// =============================================================================
