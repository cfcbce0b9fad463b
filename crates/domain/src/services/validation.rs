//! Intake validation.
//!
//! Turns a raw [`RegistrationRequest`] into a normalized [`NewRegistration`],
//! reporting the first rule that fails. Rules are checked in order: required
//! fields, day selection, email shape, then field lengths.

use shared::validation::{normalize_email, trim_optional, validate_email_shape};
use thiserror::Error;
use validator::Validate;

use crate::models::{AttendanceDay, DaySelection, NewRegistration, RegistrationRequest};

/// Why an intake payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationValidationError {
    #[error("Full name, email, and affiliation are required (missing: {0})")]
    MissingField(&'static str),

    #[error("Please select at least one day to attend")]
    NoDaySelected,

    #[error("Unrecognized day '{0}'. Must be one of: day1, day2, day3, day4, day5")]
    InvalidDayToken(String),

    #[error("Please provide a valid email address")]
    InvalidEmailFormat,

    #[error("{message}")]
    FieldTooLong { field: String, message: String },
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, RegistrationValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(RegistrationValidationError::MissingField(field))
}

/// Validates and normalizes an intake payload. Pure; no side effects.
pub fn validate_registration(
    request: &RegistrationRequest,
) -> Result<NewRegistration, RegistrationValidationError> {
    let full_name = required(request.full_name.as_deref(), "fullName")?;
    let email = required(request.email.as_deref(), "email")?;
    let affiliation = required(request.affiliation.as_deref(), "affiliation")?;

    let tokens = match request.selected_days.as_deref() {
        Some(tokens) if !tokens.is_empty() => tokens,
        _ => return Err(RegistrationValidationError::NoDaySelected),
    };
    let mut days = DaySelection::default();
    for token in tokens {
        let day: AttendanceDay = token
            .trim()
            .parse()
            .map_err(|_| RegistrationValidationError::InvalidDayToken(token.clone()))?;
        days.set(day, true);
    }

    validate_email_shape(&email).map_err(|_| RegistrationValidationError::InvalidEmailFormat)?;

    let registration = NewRegistration {
        full_name,
        email: normalize_email(&email),
        affiliation,
        phone: trim_optional(request.phone.as_deref()),
        research_interests: trim_optional(request.interests.as_deref()),
        days,
    };

    if let Err(errors) = registration.validate() {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some((field, errs)) = fields.into_iter().next() {
            let message = errs
                .first()
                .and_then(|e| e.message.clone())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is too long", field));
            return Err(RegistrationValidationError::FieldTooLong {
                field: field.to_string(),
                message,
            });
        }
    }

    Ok(registration)
}
