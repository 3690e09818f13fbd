//! Command handlers called by the front end.
//!
//! Each handler validates its request, delegates to the [`ImageStorage`](crate::storage::ImageStorage)
//! held by [`AppState`](crate::core::AppState), and wraps failures in a
//! [`CommandError`](crate::utils::CommandError):
//! - [`upload_file`]: Normalize and upload one image
//! - [`list_files`]: List one day of uploads
//! - [`download_file`]: Stream one object
//! - [`delete_file`]: Delete one object

mod storage;

pub use storage::*;
