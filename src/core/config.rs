//! Settings file for the command-line front end.
//!
//! ```toml
//! [connection]
//! region = "eu-west-1"
//! bucketName = "photos"
//! basePath = "uploads"
//! accessKey = "..."
//! secretKey = "..."
//!
//! [image_processing]
//! maxWidth = 2048
//! maxHeight = 2048
//! quality = 80
//! webp = true
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::types::{Connection, ProcessingOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Bucket to talk to; commands refuse to run without one
    #[serde(default)]
    pub connection: Option<Connection>,
    #[serde(default)]
    pub image_processing: ProcessingOptions,
}

impl Settings {
    /// Reads and parses the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid settings TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }
}
