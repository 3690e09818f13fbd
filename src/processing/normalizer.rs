//! Image normalization: orient, contain-resize, re-encode, optional WebP derivative.
//!
//! The async entry point runs the codec work inside `tokio::task::spawn_blocking` so the
//! runtime is never blocked by decoding or encoding.

use bytes::Bytes;
use image::DynamicImage;
use tracing::debug;

use crate::core::ProcessingOptions;
use crate::utils::{ImageFormat, StorageServiceError, StorageServiceResult};

use super::encode::{encode_as, encode_webp};
use super::resize::{apply_orientation, read_orientation, resize_contain};

/// One encoded output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Bytes,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Result of normalization: the primary buffer and the optional WebP derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub primary: EncodedImage,
    pub secondary: Option<EncodedImage>,
}

impl NormalizedImage {
    /// Primary first, then the derivative if there is one.
    pub fn into_outputs(self) -> impl Iterator<Item = EncodedImage> {
        std::iter::once(self.primary).chain(self.secondary)
    }
}

/// Normalizes `input` on the blocking thread pool.
pub async fn normalize_image(
    input: Bytes,
    options: ProcessingOptions,
) -> StorageServiceResult<NormalizedImage> {
    tokio::task::spawn_blocking(move || normalize(&input, &options))
        .await
        .map_err(|e| {
            StorageServiceError::image_conversion("Image conversion task panicked").caused_by(e)
        })?
}

/// Normalizes `input` synchronously.
///
/// Fails with an image conversion error on any decode or encode failure; nothing is
/// returned partially.
pub fn normalize(input: &[u8], options: &ProcessingOptions) -> StorageServiceResult<NormalizedImage> {
    let detected = image::guess_format(input).map_err(|e| {
        StorageServiceError::image_conversion("Failed to detect image format").caused_by(e)
    })?;
    let format = ImageFormat::from_detected(detected)?;

    let decoded = image::load_from_memory_with_format(input, detected).map_err(|e| {
        StorageServiceError::image_conversion(format!("Failed to decode {} image", format.name()))
            .caused_by(e)
    })?;

    debug!(
        "Loaded {} image: {}×{}",
        format.name(),
        decoded.width(),
        decoded.height()
    );

    let oriented = match read_orientation(input) {
        Some(orientation) => {
            debug!("Applying EXIF orientation {orientation:?}");
            apply_orientation(decoded, orientation)
        }
        None => decoded,
    };

    let resized = resize_contain(oriented, options.max_width, options.max_height);
    let primary = encode(&resized, format, options.quality)?;

    let secondary = if options.webp && format != ImageFormat::WebP {
        Some(EncodedImage {
            bytes: Bytes::from(encode_webp(&resized)?),
            format: ImageFormat::WebP,
            width: resized.width(),
            height: resized.height(),
        })
    } else {
        None
    };

    debug!(
        "Normalized to {}×{} {} ({} bytes){}",
        primary.width,
        primary.height,
        primary.format.name(),
        primary.bytes.len(),
        secondary
            .as_ref()
            .map(|webp| format!(" + webp ({} bytes)", webp.bytes.len()))
            .unwrap_or_default()
    );

    Ok(NormalizedImage { primary, secondary })
}

fn encode(image: &DynamicImage, format: ImageFormat, quality: u32) -> StorageServiceResult<EncodedImage> {
    Ok(EncodedImage {
        bytes: Bytes::from(encode_as(image, format, quality)?),
        format,
        width: image.width(),
        height: image.height(),
    })
}
