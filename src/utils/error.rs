//! Error types for the image uploader.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.
//! [`StorageServiceError`] is what the storage pipeline returns; [`CommandError`] is what
//! the command handlers hand back across the IPC boundary.

use std::error::Error as StdError;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Boxed underlying cause attached to an error.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Stable, machine-checkable kind of a [`StorageServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageServiceErrorCode {
    ImageConversionError,
    StorageError,
    UnexpectedError,
}

/// Failure of a storage pipeline operation.
///
/// Created at the point of failure and returned unchanged to the caller.
#[derive(Error, Debug)]
pub enum StorageServiceError {
    /// Decode, orient, resize or encode failed
    #[error("{message}")]
    ImageConversion {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The remote object store rejected or failed a request
    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// Anything not classified above
    #[error("{message}")]
    Unexpected {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
}

/// Convenience result type for storage pipeline operations.
pub type StorageServiceResult<T> = Result<T, StorageServiceError>;

// Helper methods for error creation
impl StorageServiceError {
    pub fn image_conversion<T: Into<String>>(msg: T) -> Self {
        Self::ImageConversion {
            message: msg.into(),
            cause: None,
        }
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        Self::Storage {
            message: msg.into(),
            cause: None,
        }
    }

    pub fn unexpected<T: Into<String>>(msg: T) -> Self {
        Self::Unexpected {
            message: msg.into(),
            cause: None,
        }
    }

    /// Attaches the underlying error, replacing any previous cause.
    pub fn caused_by(mut self, err: impl Into<BoxError>) -> Self {
        let slot = match &mut self {
            Self::ImageConversion { cause, .. }
            | Self::Storage { cause, .. }
            | Self::Unexpected { cause, .. } => cause,
        };
        *slot = Some(err.into());
        self
    }

    pub fn code(&self) -> StorageServiceErrorCode {
        match self {
            Self::ImageConversion { .. } => StorageServiceErrorCode::ImageConversionError,
            Self::Storage { .. } => StorageServiceErrorCode::StorageError,
            Self::Unexpected { .. } => StorageServiceErrorCode::UnexpectedError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ImageConversion { message, .. }
            | Self::Storage { message, .. }
            | Self::Unexpected { message, .. } => message,
        }
    }
}

impl Serialize for StorageServiceError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StorageServiceError", 3)?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("message", self.message())?;
        state.serialize_field("cause", &self.source().map(describe_chain))?;
        state.end()
    }
}

/// Flattens an error and its sources into a single `a: b: c` line.
pub fn describe_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut next = err.source();
    while let Some(inner) = next {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        next = inner.source();
    }
    out
}

/// Validation errors for incoming requests.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationError {
    /// A required string was empty
    #[error("Missing required field: {0}")]
    MissingField(String),
    /// A field was present but out of range or malformed
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

// Helper methods for validation error creation
impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Stable kind of a [`CommandError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    BadRequest,
    StorageServiceError,
}

/// Error type returned by the command handlers.
///
/// All pipeline errors are converted to this type before being returned to the frontend.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Request parameters were rejected before reaching the pipeline
    #[error("Failed to parse request parameters: {0}")]
    BadRequest(#[from] ValidationError),

    /// The storage pipeline failed
    #[error("{message}")]
    StorageService {
        message: String,
        #[source]
        source: StorageServiceError,
    },
}

/// Convenience result type for command handlers.
pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    pub fn storage_service(msg: impl Into<String>, source: StorageServiceError) -> Self {
        Self::StorageService {
            message: msg.into(),
            source,
        }
    }

    pub fn code(&self) -> CommandErrorCode {
        match self {
            Self::BadRequest(_) => CommandErrorCode::BadRequest,
            Self::StorageService { .. } => CommandErrorCode::StorageServiceError,
        }
    }
}

impl Serialize for CommandError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CommandError", 3)?;
        state.serialize_field("code", &self.code())?;
        match self {
            Self::BadRequest(validation) => {
                state.serialize_field("message", "Failed to parse request parameters")?;
                state.serialize_field("cause", validation)?;
            }
            Self::StorageService { message, source } => {
                state.serialize_field("message", message)?;
                state.serialize_field("cause", source)?;
            }
        }
        state.end()
    }
}
