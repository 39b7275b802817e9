//! Input validation for session creation

use crate::error::ValidationError;

/// Shortest accepted session lifetime, in minutes
pub const MIN_DURATION_MINUTES: i64 = 1;
/// Longest accepted session lifetime, in minutes (24 hours)
pub const MAX_DURATION_MINUTES: i64 = 1440;
/// Minimum attendance code length, in characters
pub const MIN_CODE_LENGTH: usize = 3;
/// Maximum attendance code length, in characters
pub const MAX_CODE_LENGTH: usize = 50;

/// Validate a session duration
pub fn validate_duration(minutes: i64) -> Result<(), ValidationError> {
    if minutes < MIN_DURATION_MINUTES || minutes > MAX_DURATION_MINUTES {
        return Err(ValidationError::DurationOutOfRange);
    }

    Ok(())
}

/// Validate an attendance code
///
/// Length is measured in characters, not bytes.
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    let length = code.chars().count();

    if length < MIN_CODE_LENGTH || length > MAX_CODE_LENGTH {
        return Err(ValidationError::CodeLength);
    }

    Ok(())
}
