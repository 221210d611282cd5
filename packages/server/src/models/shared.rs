use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Generic acknowledgement body.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct Message {
    #[schema(example = "Pattern deleted successfully")]
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

/// Resolve `skip`/`limit` query values to an offset and a bounded page size.
pub fn offset_limit(skip: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (
        skip.unwrap_or(0),
        limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    )
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Reject `value` if it is longer than `max` characters.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_optional_max_len(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<(), AppError> {
    match value {
        Some(v) => validate_max_len(field, v, max),
        None => Ok(()),
    }
}

/// Minimal shape check for an email address: `local@domain.tld`, no spaces.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let invalid = || AppError::Validation("Invalid email address".into());
    validate_max_len("Email", email, 255)?;
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

/// Passwords are 8-40 characters.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(8..=40).contains(&len) {
        return Err(AppError::Validation(
            "Password must be 8-40 characters".into(),
        ));
    }
    Ok(())
}
