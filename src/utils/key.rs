//! Object key derivation.
//!
//! Keys follow `{basePath}/{YYYY-MM-DD}/{sanitizedName}.{format}` and must stay bit-exact
//! so that objects stored by earlier releases keep listing under the same day prefix.
//! Re-uploading the same name on the same day yields the same key and overwrites the object.

use chrono::NaiveDate;
use url::Url;

use crate::core::Connection;
use crate::utils::{StorageServiceError, StorageServiceResult};

/// Replaces every reserved character of a display name.
pub const PLACEHOLDER: char = '*';

/// Characters that are never allowed into a key. Whitespace of any kind is reserved as well.
pub const RESERVED_CHARACTERS: &[char] = &[
    '&', '$', '@', '=', ':', ';', '/', '\\', '+', ',', '?', '{', '}', '^', '%', '`', '[', ']',
    '"', '\'', '<', '>', '~', '#', '|',
];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn is_reserved(c: char) -> bool {
    c.is_whitespace() || RESERVED_CHARACTERS.contains(&c)
}

/// Replaces each reserved character with [`PLACEHOLDER`], one for one.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if is_reserved(c) { PLACEHOLDER } else { c })
        .collect()
}

/// Formats the day segment used in keys and list prefixes.
pub fn date_segment(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Derives the object key for `name` stored as `extension` on `today`.
pub fn derive_key(name: &str, extension: &str, base_path: Option<&str>, today: NaiveDate) -> String {
    let joined = join_key_path(&[
        base_path.unwrap_or_default(),
        &date_segment(today),
        &sanitize_name(name),
    ]);
    format!("{joined}.{extension}")
}

/// Prefix that selects every object uploaded on `date_string`.
pub fn list_prefix(base_path: Option<&str>, date_string: &str) -> String {
    join_key_path(&[base_path.unwrap_or_default(), date_string])
}

/// Joins segments with `/` and normalizes the result like a POSIX path join.
///
/// Empty and `.` segments vanish, `..` drops the previous segment, a leading `/` on the
/// joined path is kept, and an empty result becomes `.`.
pub fn join_key_path(segments: &[&str]) -> String {
    let joined = segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() {
        return ".".to_owned();
    }

    let absolute = joined.starts_with('/');
    let trailing = joined.ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if !absolute => parts.push(".."),
                _ => {}
            },
            other => parts.push(other),
        }
    }

    let mut normalized = parts.join("/");
    if normalized.is_empty() && !absolute {
        normalized.push('.');
    }
    if trailing && !normalized.is_empty() {
        normalized.push('/');
    }
    if absolute {
        normalized.insert(0, '/');
    }
    normalized
}

/// Default endpoint of the provider for `region`.
pub fn default_endpoint(region: &str) -> String {
    format!("https://s3.{region}.amazonaws.com")
}

/// Virtual-hosted-style URL: `https://{bucket}.{host}/{key}`.
pub fn object_url(connection: &Connection, key: &str) -> StorageServiceResult<String> {
    let endpoint = connection
        .endpoint
        .as_deref()
        .filter(|e| !e.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| default_endpoint(&connection.region));

    let url = Url::parse(&endpoint).map_err(|e| {
        StorageServiceError::storage(format!("Invalid endpoint: {endpoint}")).caused_by(e)
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| StorageServiceError::storage(format!("Endpoint has no host: {endpoint}")))?;

    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };

    Ok(format!("https://{}.{host}/{key}", connection.bucket_name))
}
