//! Input validation helpers
//!
//! Field rules live on the request types as `validator` derive attributes.
//! This module turns a failed validation into the single message string the
//! API returns to callers.

use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

/// bcrypt reads at most this many bytes of a password and ignores the rest
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Reject passwords bcrypt would silently truncate.
///
/// Counted in bytes, unlike the `length` rule which counts characters.
pub fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut error = ValidationError::new("password_too_long");
        error.message = Some(Cow::Owned(format!(
            "password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
        return Err(error);
    }
    Ok(())
}

/// Flatten validation errors into one deterministic, human-readable message.
///
/// Fields are reported in alphabetical order; each field contributes the
/// custom message from its rule, or `"<field> is invalid"` when none was set.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();

    if messages.is_empty() {
        "Invalid request".to_string()
    } else {
        messages.join("; ")
    }
}
