//! Shared validation utilities
//!
//! Field rules used by the user, role and permission services.
//!
//! # Examples
//!
//! ```rust,ignore
//! use rbac_server::features::shared::validation::{validate_name, validate_username};
//!
//! validate_username("alice")?;
//! validate_name("display_name", "Administrator", 100)?;
//! ```

use thiserror::Error;

use crate::models::{STATUS_DISABLED, STATUS_ENABLED};

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 50;
pub const EMAIL_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 6;
/// bcrypt ignores input past 72 bytes
pub const PASSWORD_MAX_LENGTH: usize = 72;

/// Errors that can occur during field validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be at most {max_length} characters")]
    TooLong { field: &'static str, max_length: usize },

    #[error("Username must be between 3 and 50 characters and contain only letters, numbers or '_'")]
    InvalidUsername,

    #[error("Email address is invalid")]
    InvalidEmail,

    #[error("Password must be between 6 and 72 bytes")]
    InvalidPassword,

    #[error("Status must be 0 (disabled) or 1 (enabled)")]
    InvalidStatus,
}

/// Errors that can occur when validating id lists and path ids
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    #[error("{field} must contain at least one id")]
    Empty { field: &'static str },

    #[error("{field} contains invalid id {id}; ids must be positive")]
    NotPositive { field: &'static str, id: i64 },

    #[error("Invalid id '{0}'; expected a positive integer")]
    Malformed(String),
}

/// Validate a required, bounded text field
pub fn validate_name(
    field: &'static str,
    value: &str,
    max_length: usize,
) -> Result<(), FieldValidationError> {
    if value.trim().is_empty() {
        return Err(FieldValidationError::Required { field });
    }

    if value.chars().count() > max_length {
        return Err(FieldValidationError::TooLong { field, max_length });
    }

    Ok(())
}

/// Validate an optional, bounded text field
pub fn validate_optional(
    field: &'static str,
    value: Option<&str>,
    max_length: usize,
) -> Result<(), FieldValidationError> {
    match value {
        Some(v) if v.chars().count() > max_length => {
            Err(FieldValidationError::TooLong { field, max_length })
        },
        _ => Ok(()),
    }
}

pub fn validate_username(username: &str) -> Result<(), FieldValidationError> {
    let length = username.chars().count();
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&length)
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(FieldValidationError::InvalidUsername);
    }
    Ok(())
}

/// Structural check only: one `@` with a non-empty local part and a dotted domain
pub fn validate_email(email: &str) -> Result<(), FieldValidationError> {
    if email.len() > EMAIL_MAX_LENGTH || email.chars().any(char::is_whitespace) {
        return Err(FieldValidationError::InvalidEmail);
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        },
        _ => Err(FieldValidationError::InvalidEmail),
    }
}

pub fn validate_password(password: &str) -> Result<(), FieldValidationError> {
    if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&password.len()) {
        return Err(FieldValidationError::InvalidPassword);
    }
    Ok(())
}

pub fn validate_status(status: i16) -> Result<(), FieldValidationError> {
    if status != STATUS_ENABLED && status != STATUS_DISABLED {
        return Err(FieldValidationError::InvalidStatus);
    }
    Ok(())
}

/// Validate a non-empty list of positive ids
pub fn validate_ids(field: &'static str, ids: &[i64]) -> Result<(), IdValidationError> {
    if ids.is_empty() {
        return Err(IdValidationError::Empty { field });
    }
    if let Some(&id) = ids.iter().find(|id| **id <= 0) {
        return Err(IdValidationError::NotPositive { field, id });
    }
    Ok(())
}

/// Parse a path segment into a positive record id
pub fn parse_id(raw: &str) -> Result<i64, IdValidationError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(IdValidationError::Malformed(raw.to_string())),
    }
}
