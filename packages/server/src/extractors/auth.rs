use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// The account is re-read on every request, so a deactivated or deleted user
/// loses access immediately even while holding a valid token.
pub struct AuthUser {
    pub user: user::Model,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_superuser(&self) -> bool {
        self.user.is_superuser
    }

    pub fn require_superuser(&self) -> Result<(), AppError> {
        if self.user.is_superuser {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    /// Owners and superusers pass.
    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.user.is_superuser || self.user.id == owner_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;
        let user_id = claims.user_id().ok_or(AppError::TokenInvalid)?;

        let user = user::Entity::find_by_id(user_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if !user.is_active {
            return Err(AppError::InactiveUser);
        }

        Ok(AuthUser { user })
    }
}
