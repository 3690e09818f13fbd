//! Orientation and contain-resize steps of normalization.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

/// EXIF orientation tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Orientation {
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    Transverse = 7,
    Rotate270 = 8,
}

impl Orientation {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Normal),
            2 => Some(Self::FlipHorizontal),
            3 => Some(Self::Rotate180),
            4 => Some(Self::FlipVertical),
            5 => Some(Self::Transpose),
            6 => Some(Self::Rotate90),
            7 => Some(Self::Transverse),
            8 => Some(Self::Rotate270),
            _ => None,
        }
    }
}

/// Reads the EXIF orientation from an encoded image, if it carries one.
pub fn read_orientation(data: &[u8]) -> Option<Orientation> {
    let mut cursor = std::io::Cursor::new(data);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;

    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)?;

    Orientation::from_u16(u16::try_from(value).ok()?)
}

/// Rotates and flips `img` so it displays upright.
pub fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90 => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270 => img.rotate270(),
    }
}

/// Largest size that fits inside `max_w × max_h` keeping the aspect ratio.
///
/// Never enlarges: the scale factor is capped at 1. Each side is at least one pixel.
pub fn contain_dimensions(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (src_w, src_h);
    }

    let scale = (max_w as f64 / src_w as f64)
        .min(max_h as f64 / src_h as f64)
        .min(1.0);

    if scale >= 1.0 {
        return (src_w, src_h);
    }

    let fit = |side: u32, bound: u32| ((side as f64 * scale).round() as u32).clamp(1, bound.max(1));
    (fit(src_w, max_w), fit(src_h, max_h))
}

/// Shrinks `img` to fit inside the bounds. Returns it unchanged when it already fits.
pub fn resize_contain(img: DynamicImage, max_w: u32, max_h: u32) -> DynamicImage {
    let (src_w, src_h) = (img.width(), img.height());
    let (w, h) = contain_dimensions(src_w, src_h, max_w, max_h);

    if (w, h) == (src_w, src_h) {
        return img;
    }

    debug!("Resizing {src_w}×{src_h} → {w}×{h}");
    img.resize_exact(w, h, FilterType::Lanczos3)
}
