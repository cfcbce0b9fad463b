//! Common validation utilities.

use validator::ValidationError;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: regex::Regex =
        regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Validates that an email has the `local@domain.tld` shape.
///
/// Exactly one `@`, no whitespace, and at least one `.` after the `@`.
pub fn validate_email_shape(email: &str) -> Result<(), ValidationError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email_format");
        err.message = Some("Please provide a valid email address".into());
        Err(err)
    }
}

/// Normalizes an email for storage and lookup (trimmed, lower-cased).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims an optional free-text field, mapping blank values to `None`.
pub fn trim_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
