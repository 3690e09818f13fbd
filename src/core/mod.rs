//! Core application types and state management.
//!
//! This module contains the fundamental types used throughout the application:
//! - [`Connection`]: Bucket, region, endpoint and credentials of one call
//! - [`ProcessingOptions`]: Bounds, quality and WebP flag for normalization
//! - [`UploadResult`], [`ListedObject`], [`ListPage`]: Storage results
//! - [`Settings`]: Settings file read by the command-line front end
//! - [`AppState`]: Storage capability shared by the command handlers

mod config;
mod state;
mod types;

pub use config::Settings;
pub use state::AppState;
pub use types::{Connection, ListPage, ListedObject, ProcessingOptions, UploadResult};
