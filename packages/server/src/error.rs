use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::attachments::{ReleaseError, UploadError};

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `INACTIVE_USER`, `PERMISSION_DENIED`,
    /// `NOT_FOUND`, `EMAIL_TAKEN`, `STORE_UNAVAILABLE`, `CLEANUP_FAILED`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Difficulty must be between 1 and 5")]
    pub message: String,
    /// Object keys that could not be removed. Only present for `CLEANUP_FAILED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = json!(["4f1c0e8a9b7d4c2e8f3a6b5d1e0c9a7b.pdf"]))]
    pub keys: Option<Vec<String>>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            keys: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    InactiveUser,
    PermissionDenied,
    NotFound(String),
    EmailTaken,
    /// The object store rejected an operation; the message names what was affected.
    StoreUnavailable(String),
    /// Attachments could not be deleted; the owning record was left in place.
    CleanupFailed {
        keys: Vec<String>,
    },
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_MISSING", "Authentication required"),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_INVALID", "Could not validate credentials"),
            ),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("INVALID_CREDENTIALS", "Incorrect email or password"),
            ),
            AppError::InactiveUser => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("INACTIVE_USER", "Inactive user"),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("PERMISSION_DENIED", "Not enough permissions"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg)),
            AppError::EmailTaken => (
                StatusCode::CONFLICT,
                ErrorBody::new(
                    "EMAIL_TAKEN",
                    "A user with this email already exists in the system",
                ),
            ),
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Object store error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("STORE_UNAVAILABLE", msg),
                )
            }
            AppError::CleanupFailed { keys } => {
                tracing::error!(?keys, "Attachment cleanup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "CLEANUP_FAILED",
                        message: format!(
                            "Failed to delete {} attachment(s); deletion was aborted",
                            keys.len()
                        ),
                        keys: Some(keys),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("File '{key}' not found")),
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            StorageError::SizeLimitExceeded { actual, limit } => AppError::Validation(format!(
                "File of {actual} bytes exceeds maximum size of {limit} bytes"
            )),
            other => AppError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        if let StorageError::SizeLimitExceeded { limit, .. } = err.source {
            return AppError::Validation(format!(
                "File for '{}' exceeds maximum size of {limit} bytes",
                err.slot.form_field()
            ));
        }
        let mut message = format!("Failed to store file for slot '{}'", err.slot.column_name());
        if !err.orphaned.is_empty() {
            message.push_str(&format!(
                "; left behind: {}",
                err.orphaned.join(", ")
            ));
        }
        AppError::StoreUnavailable(message)
    }
}

impl From<ReleaseError> for AppError {
    fn from(err: ReleaseError) -> Self {
        AppError::CleanupFailed {
            keys: err.failed_keys(),
        }
    }
}
