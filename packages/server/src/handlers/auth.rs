use axum::{Json, extract::State};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{LoginRequest, Token, validate_login_request};
use crate::models::user::UserResponse;
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/access-token",
    tag = "Login",
    operation_id = "loginAccessToken",
    summary = "Obtain an access token",
    description = "Exchanges email and password for a bearer token. Inactive accounts are refused.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token", body = Token),
        (status = 400, description = "Wrong credentials or inactive account (INVALID_CREDENTIALS, INACTIVE_USER, VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login_access_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<Token>, AppError> {
    validate_login_request(&payload)?;

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.trim()))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.hashed_password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AppError::InactiveUser);
    }

    let auth = &state.config.auth;
    let token = jwt::sign(user.id, &auth.jwt_secret, auth.access_token_expire_minutes)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(Token::bearer(token)))
}

#[utoipa::path(
    post,
    path = "/test-token",
    tag = "Login",
    operation_id = "testToken",
    summary = "Check an access token",
    description = "Returns the account the bearer token belongs to.",
    responses(
        (status = 200, description = "Token owner", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = %auth_user.id()))]
pub async fn test_token(auth_user: AuthUser) -> Json<UserResponse> {
    Json(auth_user.user.into())
}
