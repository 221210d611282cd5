use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared::{
    double_option, validate_email, validate_optional_max_len, validate_password,
};
use crate::entity::user;
use crate::error::AppError;

/// Self-registration request.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "maker@example.com")]
    pub email: String,
    /// 8-40 characters.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    #[schema(example = "Ada Lovelace")]
    pub full_name: Option<String>,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_email(payload.email.trim())?;
    validate_password(&payload.password)?;
    validate_optional_max_len("Full name", payload.full_name.as_deref(), 255)
}

/// Account creation by a superuser.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "maker@example.com")]
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

fn default_true() -> bool {
    true
}

pub fn validate_create_user(payload: &CreateUserRequest) -> Result<(), AppError> {
    validate_email(payload.email.trim())?;
    validate_password(&payload.password)?;
    validate_optional_max_len("Full name", payload.full_name.as_deref(), 255)
}

/// Partial account update by a superuser.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub full_name: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

pub fn validate_update_user(payload: &UpdateUserRequest) -> Result<(), AppError> {
    if let Some(email) = &payload.email {
        validate_email(email.trim())?;
    }
    if let Some(password) = &payload.password {
        validate_password(password)?;
    }
    validate_optional_max_len("Full name", payload.full_name.clone().flatten().as_deref(), 255)
}

/// Changes a user may make to their own profile.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateMeRequest {
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub full_name: Option<Option<String>>,
}

pub fn validate_update_me(payload: &UpdateMeRequest) -> Result<(), AppError> {
    if let Some(email) = &payload.email {
        validate_email(email.trim())?;
    }
    validate_optional_max_len("Full name", payload.full_name.clone().flatten().as_deref(), 255)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn validate_update_password(payload: &UpdatePasswordRequest) -> Result<(), AppError> {
    validate_password(&payload.new_password)?;
    if payload.current_password == payload.new_password {
        return Err(AppError::Validation(
            "New password cannot be the same as the current one".into(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Number of users to skip. Default: 0.
    pub skip: Option<u64>,
    /// Page size (1-1000). Default: 100.
    pub limit: Option<u64>,
}

/// Public view of an account.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "maker@example.com")]
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            full_name: m.full_name,
            is_active: m.is_active,
            is_superuser: m.is_superuser,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    /// Total number of users.
    pub count: u64,
}
