pub mod error;
pub mod formats;
pub mod key;
pub mod validation;

pub use error::{
    BoxError, CommandError, CommandErrorCode, CommandResult, StorageServiceError,
    StorageServiceErrorCode, StorageServiceResult, ValidationError,
};
pub use formats::ImageFormat;
pub use key::{derive_key, list_prefix, object_url, sanitize_name};
pub use validation::{
    validate_connection, validate_date_string, validate_processing_options,
};
