use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::utils::StorageServiceError;

/// Image formats the normalizer can decode and write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    JPEG,
    PNG,
    WebP,
    GIF,
    TIFF,
    BMP,
}

impl ImageFormat {
    /// Format name as used for object key extensions
    pub fn name(&self) -> &'static str {
        match self {
            Self::JPEG => "jpeg",
            Self::PNG => "png",
            Self::WebP => "webp",
            Self::GIF => "gif",
            Self::TIFF => "tiff",
            Self::BMP => "bmp",
        }
    }

    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::JPEG => &["jpeg", "jpg"],
            Self::PNG => &["png"],
            Self::WebP => &["webp"],
            Self::GIF => &["gif"],
            Self::TIFF => &["tiff", "tif"],
            Self::BMP => &["bmp"],
        }
    }

    /// Check if the extension matches this format
    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.extensions().contains(&ext.as_str())
    }

    /// Content type sent along with the stored object.
    pub fn mime_type(&self) -> Option<String> {
        mime_guess::from_ext(self.name())
            .first()
            .map(|mime| mime.essence_str().to_owned())
    }

    /// Format named by the extension of `path`, if it has one.
    pub fn from_path(path: &Path) -> Option<Result<Self, StorageServiceError>> {
        path.extension().map(|ext| ext.to_string_lossy().parse())
    }

    /// Whether re-encoding honours the configured quality
    pub fn accepts_quality(&self) -> bool {
        matches!(self, Self::JPEG | Self::PNG)
    }

    /// Maps the codec library's detected format onto a supported one.
    pub fn from_detected(format: image::ImageFormat) -> Result<Self, StorageServiceError> {
        match format {
            image::ImageFormat::Jpeg => Ok(Self::JPEG),
            image::ImageFormat::Png => Ok(Self::PNG),
            image::ImageFormat::WebP => Ok(Self::WebP),
            image::ImageFormat::Gif => Ok(Self::GIF),
            image::ImageFormat::Tiff => Ok(Self::TIFF),
            image::ImageFormat::Bmp => Ok(Self::BMP),
            other => Err(StorageServiceError::image_conversion(format!(
                "Unsupported image format: {other:?}"
            ))),
        }
    }

    /// The codec library's counterpart of this format
    pub fn codec_format(&self) -> image::ImageFormat {
        match self {
            Self::JPEG => image::ImageFormat::Jpeg,
            Self::PNG => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
            Self::GIF => image::ImageFormat::Gif,
            Self::TIFF => image::ImageFormat::Tiff,
            Self::BMP => image::ImageFormat::Bmp,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = StorageServiceError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        [
            Self::JPEG,
            Self::PNG,
            Self::WebP,
            Self::GIF,
            Self::TIFF,
            Self::BMP,
        ]
        .into_iter()
        .find(|format| format.matches_extension(ext))
        .ok_or_else(|| {
            StorageServiceError::image_conversion(format!("Unsupported image format: {ext}"))
        })
    }
}
