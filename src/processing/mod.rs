//! Image normalization on top of the `image` codec library.
//!
//! # Architecture
//!
//! - [`normalizer`]: Drives decode → orient → resize → encode and runs it on the blocking pool.
//! - [`resize`]: EXIF orientation and contain-resize without enlargement.
//! - [`encode`]: Maps target format and quality to the codec's encoders.

pub mod encode;
pub mod normalizer;
pub mod resize;

pub use normalizer::{EncodedImage, NormalizedImage, normalize, normalize_image};
pub use resize::contain_dimensions;
