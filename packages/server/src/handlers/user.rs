use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entity::{pattern, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::handlers::pattern::purge_patterns;
use crate::models::shared::{Message, offset_limit};
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::hash;

#[utoipa::path(
    post,
    path = "/signup",
    tag = "Users",
    operation_id = "registerUser",
    summary = "Create an account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let model = insert_user(
        &state.db,
        NewUser {
            email: payload.email.trim(),
            password: &payload.password,
            full_name: payload.full_name,
            is_active: true,
            is_superuser: false,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    operation_id = "readUserMe",
    summary = "Get the current account",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = %auth_user.id()))]
pub async fn read_user_me(auth_user: AuthUser) -> Json<UserResponse> {
    Json(auth_user.user.into())
}

#[utoipa::path(
    patch,
    path = "/me",
    tag = "Users",
    operation_id = "updateUserMe",
    summary = "Update the current account's profile",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.id()))]
pub async fn update_user_me(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateMeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate_update_me(&payload)?;

    let user_id = auth_user.id();
    let mut active: user::ActiveModel = auth_user.user.into();
    if let Some(email) = payload.email {
        let email = email.trim().to_string();
        ensure_email_free(&state.db, &email, Some(user_id)).await?;
        active.email = Set(email);
    }
    if let Some(full_name) = payload.full_name {
        active.full_name = Set(full_name);
    }

    let model = active.update(&state.db).await.map_err(map_unique_email)?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/me/password",
    tag = "Users",
    operation_id = "updatePasswordMe",
    summary = "Change the current account's password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = Message),
        (status = 400, description = "Wrong current password or invalid new one (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.id()))]
pub async fn update_password_me(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdatePasswordRequest>,
) -> Result<Json<Message>, AppError> {
    let matches = hash::verify_password(&payload.current_password, &auth_user.user.hashed_password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !matches {
        return Err(AppError::Validation("Incorrect password".into()));
    }
    validate_update_password(&payload)?;

    let hashed = hash::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
    let mut active: user::ActiveModel = auth_user.user.into();
    active.hashed_password = Set(hashed);
    active.update(&state.db).await?;

    Ok(Json(Message::new("Password updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/me",
    tag = "Users",
    operation_id = "deleteUserMe",
    summary = "Delete the current account",
    description = "Deletes the account together with its patterns and their files. Superusers \
        cannot delete themselves.",
    responses(
        (status = 200, description = "Account deleted", body = Message),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Superuser (PERMISSION_DENIED)", body = ErrorBody),
        (status = 500, description = "Some files could not be deleted (CLEANUP_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn delete_user_me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Message>, AppError> {
    if auth_user.is_superuser() {
        return Err(AppError::PermissionDenied);
    }
    remove_user(&state, auth_user.id()).await?;
    Ok(Json(Message::new("User deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List accounts",
    description = "Superuser only.",
    params(UserListQuery),
    responses(
        (status = 200, description = "Accounts", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_superuser()?;
    let (skip, limit) = offset_limit(query.skip, query.limit);

    let count = user::Entity::find().count(&state.db).await?;
    let data = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .offset(Some(skip))
        .limit(Some(limit))
        .all(&state.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse { data, count }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Users",
    operation_id = "createUser",
    summary = "Create an account on someone's behalf",
    description = "Superuser only.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(email = %payload.email))]
pub async fn create_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_superuser()?;
    validate_create_user(&payload)?;

    let model = insert_user(
        &state.db,
        NewUser {
            email: payload.email.trim(),
            password: &payload.password,
            full_name: payload.full_name,
            is_active: payload.is_active,
            is_superuser: payload.is_superuser,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "readUserById",
    summary = "Get an account by ID",
    description = "Users may read their own account; superusers may read any.",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn read_user_by_id(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    if id == auth_user.id() {
        return Ok(Json(auth_user.user.into()));
    }
    auth_user.require_superuser()?;
    let model = find_user(&state.db, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Update an account",
    description = "Superuser only. Only provided fields change.",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id = %id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_superuser()?;
    validate_update_user(&payload)?;

    let existing = find_user(&state.db, id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(email) = payload.email {
        let email = email.trim().to_string();
        ensure_email_free(&state.db, &email, Some(id)).await?;
        active.email = Set(email);
    }
    if let Some(password) = payload.password {
        let hashed = hash::hash_password(&password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
        active.hashed_password = Set(hashed);
    }
    if let Some(full_name) = payload.full_name {
        active.full_name = Set(full_name);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_superuser) = payload.is_superuser {
        active.is_superuser = Set(is_superuser);
    }

    let model = active.update(&state.db).await.map_err(map_unique_email)?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Users",
    operation_id = "deleteUser",
    summary = "Delete an account",
    description = "Superuser only. Deletes the account together with its patterns and their files. \
        If any file cannot be deleted the account is kept and the failing keys are returned.",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deleted", body = Message),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden, or deleting yourself (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Some files could not be deleted (CLEANUP_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, AppError> {
    auth_user.require_superuser()?;
    if id == auth_user.id() {
        return Err(AppError::PermissionDenied);
    }
    remove_user(&state, id).await?;
    Ok(Json(Message::new("User deleted successfully")))
}

struct NewUser<'a> {
    email: &'a str,
    password: &'a str,
    full_name: Option<String>,
    is_active: bool,
    is_superuser: bool,
}

async fn insert_user<C: ConnectionTrait>(db: &C, new: NewUser<'_>) -> Result<user::Model, AppError> {
    ensure_email_free(db, new.email, None).await?;

    let hashed = hash::hash_password(new.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(new.email.to_string()),
        full_name: Set(new.full_name),
        hashed_password: Set(hashed),
        is_active: Set(new.is_active),
        is_superuser: Set(new.is_superuser),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    model.insert(db).await.map_err(map_unique_email)
}

/// Delete a user after releasing every attachment of every pattern they own.
///
/// If any attachment cannot be released, patterns that were fully released
/// are still deleted, the rest keep only their failed slots, and the user
/// row stays.
async fn remove_user(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let txn = state.db.begin().await?;

    user::Entity::find_by_id(user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let patterns = pattern::Entity::find()
        .filter(pattern::Column::OwnerId.eq(user_id))
        .order_by_asc(pattern::Column::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let pattern_count = patterns.len();

    let failed = purge_patterns(&txn, &state.attachments, patterns).await?;
    if !failed.is_empty() {
        txn.commit().await?;
        return Err(AppError::CleanupFailed { keys: failed });
    }

    user::Entity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    info!(%user_id, patterns = pattern_count, "User deleted");
    Ok(())
}

async fn find_user<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn ensure_email_free<C: ConnectionTrait>(
    db: &C,
    email: &str,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;
    match existing {
        Some(other) if Some(other.id) != except => Err(AppError::EmailTaken),
        _ => Ok(()),
    }
}

/// A concurrent insert can still win the race past `ensure_email_free`.
fn map_unique_email(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Email race condition: unique constraint caught on write");
            AppError::EmailTaken
        }
        _ => AppError::from(err),
    }
}
