use chrono::NaiveDate;

use crate::core::{Connection, ProcessingOptions};
use crate::utils::ValidationError;

type Result<T> = std::result::Result<T, ValidationError>;

/// Validates that the connection carries every required field
pub fn validate_connection(connection: &Connection) -> Result<()> {
    require("region", &connection.region)?;
    require("bucketName", &connection.bucket_name)?;
    require("accessKey", &connection.access_key)?;
    require("secretKey", &connection.secret_key)?;
    Ok(())
}

/// Validates image processing options
pub fn validate_processing_options(options: &ProcessingOptions) -> Result<()> {
    if options.max_width == 0 {
        return Err(ValidationError::invalid("maxWidth", "must be at least 1"));
    }

    if options.max_height == 0 {
        return Err(ValidationError::invalid("maxHeight", "must be at least 1"));
    }

    if options.quality == 0 || options.quality > 100 {
        return Err(ValidationError::invalid(
            "quality",
            format!("{} is not between 1 and 100", options.quality),
        ));
    }

    Ok(())
}

/// Validates a `YYYY-MM-DD` list date
pub fn validate_date_string(date_string: &str) -> Result<()> {
    require("dateString", date_string)?;
    NaiveDate::parse_from_str(date_string, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|e| ValidationError::invalid("dateString", e.to_string()))?;

    // chrono accepts unpadded fields; keys are always zero-padded
    if date_string.len() != 10 {
        return Err(ValidationError::invalid(
            "dateString",
            "expected the YYYY-MM-DD form",
        ));
    }
    Ok(())
}

/// Rejects empty strings for a required field
pub fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}
