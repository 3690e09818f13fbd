//! Maps a target format and quality onto the codec library's encoders.
//!
//! JPEG and PNG honour the configured quality. Every other format keeps the codec's
//! native encoding behaviour; WebP is always written lossless.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage};

use crate::utils::{ImageFormat, StorageServiceError};

type Result<T> = std::result::Result<T, StorageServiceError>;

/// Encodes `image` as JPEG at `quality` (1-100). Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u32) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let quality = quality.clamp(1, 100) as u8;

    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| conversion_error("JPEG encode failed", e))?;

    Ok(buf.into_inner())
}

/// Encodes `image` as PNG. Lower quality buys a smaller file at the cost of encode time.
pub fn encode_png(image: &DynamicImage, quality: u32) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut buf, png_compression(quality), PngFilter::Adaptive);

    as_encodable(image)
        .write_with_encoder(encoder)
        .map_err(|e| conversion_error("PNG encode failed", e))?;

    Ok(buf.into_inner())
}

/// Encodes `image` as lossless WebP.
pub fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = WebPEncoder::new_lossless(&mut buf);

    let pixels = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    pixels
        .write_with_encoder(encoder)
        .map_err(|e| conversion_error("WebP encode failed", e))?;

    Ok(buf.into_inner())
}

/// Encodes `image` in `format` with the codec's default settings, from RGBA pixels.
fn encode_native(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());

    DynamicImage::ImageRgba8(image.to_rgba8())
        .write_to(&mut buf, format.codec_format())
        .map_err(|e| conversion_error(&format!("{} encode failed", format.name()), e))?;

    Ok(buf.into_inner())
}

/// Dispatches to the correct encoder for `format`.
pub fn encode_as(image: &DynamicImage, format: ImageFormat, quality: u32) -> Result<Vec<u8>> {
    match format {
        ImageFormat::JPEG => encode_jpeg(image, quality),
        ImageFormat::PNG => encode_png(image, quality),
        ImageFormat::WebP => encode_webp(image),
        ImageFormat::GIF | ImageFormat::TIFF | ImageFormat::BMP => encode_native(image, format),
    }
}

fn png_compression(quality: u32) -> CompressionType {
    match quality {
        0..50 => CompressionType::Best,
        50..90 => CompressionType::Default,
        _ => CompressionType::Fast,
    }
}

// Float pixels have no PNG representation
fn as_encodable(image: &DynamicImage) -> std::borrow::Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => {
            std::borrow::Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16()))
        }
        _ => std::borrow::Cow::Borrowed(image),
    }
}

fn conversion_error(context: &str, err: image::ImageError) -> StorageServiceError {
    StorageServiceError::image_conversion(context).caused_by(err)
}
