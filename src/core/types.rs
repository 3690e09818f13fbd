//! Core types for connections, processing options and storage results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one remote bucket and the credentials used to reach it.
///
/// Supplied per call and never persisted by the pipeline.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Custom S3-compatible endpoint; the provider's regional endpoint when absent
    #[serde(default)]
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket_name: String,
    /// Key prefix prepended to every derived key
    #[serde(default)]
    pub base_path: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

// Keep the secret out of logs
impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("base_path", &self.base_path)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// How an input image is normalized before upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOptions {
    /// Upper bound for the output width in pixels
    pub max_width: u32,
    /// Upper bound for the output height in pixels
    pub max_height: u32,
    /// Encoder quality (1-100) for formats that accept one
    pub quality: u32,
    /// Whether to also store a WebP derivative
    pub webp: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            max_width: 2048,
            max_height: 2048,
            quality: 80,
            webp: false,
        }
    }
}

/// Keys of the objects written by an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Key of the re-encoded primary object
    pub path: String,
    /// Key of the WebP derivative, when one was produced
    pub webp_path: Option<String>,
}

/// One object returned by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedObject {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: i64,
    /// Virtual-hosted-style URL of the object
    pub url: String,
}

/// One page of a prefix listing, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub images: Vec<ListedObject>,
    /// Opaque continuation token for the next page
    pub next_token: Option<String>,
}
