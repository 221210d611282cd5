use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::attachments::{AttachmentCoordinator, SlotMap};
use crate::entity::pattern;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::pattern::*;
use crate::models::shared::{Message, offset_limit};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Patterns",
    operation_id = "listPatterns",
    summary = "List patterns",
    description = "Returns patterns ordered by most recently updated. Every provided filter must \
        match exactly. `count` is the number of matching patterns regardless of `skip`/`limit`. \
        With `self_patterns=true` only the caller's own patterns are returned.",
    params(PatternListQuery),
    responses(
        (status = 200, description = "Matching patterns", body = PatternListResponse),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.id()))]
pub async fn list_patterns(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PatternListQuery>,
) -> Result<Json<PatternListResponse>, AppError> {
    let (skip, limit) = offset_limit(query.skip, query.limit);

    let mut select = pattern::Entity::find();
    if query.self_patterns {
        select = select.filter(pattern::Column::OwnerId.eq(auth_user.id()));
    }
    if let Some(ref title) = query.title {
        select = select.filter(pattern::Column::Title.eq(title.as_str()));
    }
    if let Some(brand) = query.brand {
        select = select.filter(pattern::Column::Brand.eq(brand.as_str()));
    }
    if let Some(version) = query.version {
        select = select.filter(pattern::Column::Version.eq(version.as_str()));
    }
    if let Some(for_who) = query.for_who {
        select = select.filter(pattern::Column::ForWho.eq(for_who.as_str()));
    }
    if let Some(category) = query.category {
        select = select.filter(pattern::Column::Category.eq(category.as_str()));
    }
    if let Some(difficulty) = query.difficulty {
        select = select.filter(pattern::Column::Difficulty.eq(difficulty));
    }
    if let Some(ref fabric) = query.fabric {
        select = select.filter(pattern::Column::Fabric.eq(fabric.as_str()));
    }
    if let Some(fabric_amount) = query.fabric_amount {
        select = select.filter(pattern::Column::FabricAmount.eq(fabric_amount));
    }

    let count = select.clone().count(&state.db).await?;

    let data = select
        .order_by_desc(pattern::Column::UpdatedAt)
        .offset(Some(skip))
        .limit(Some(limit))
        .all(&state.db)
        .await?
        .into_iter()
        .map(PatternResponse::from)
        .collect();

    Ok(Json(PatternListResponse { data, count }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Patterns",
    operation_id = "getPattern",
    summary = "Get a pattern by ID",
    description = "Only the owner or a superuser may read a pattern.",
    params(("id" = Uuid, Path, description = "Pattern ID")),
    responses(
        (status = 200, description = "Pattern details", body = PatternResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Pattern not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn get_pattern(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PatternResponse>, AppError> {
    let model = find_pattern(&state.db, id).await?;
    auth_user.require_owner(model.owner_id)?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Patterns",
    operation_id = "createPattern",
    summary = "Create a pattern",
    description = "Creates a pattern owned by the caller. All attachment slots start empty; \
        files are added with the upload endpoint.",
    request_body = CreatePatternRequest,
    responses(
        (status = 201, description = "Pattern created", body = PatternResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_pattern(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePatternRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_pattern(&payload)?;

    let now = chrono::Utc::now();
    let new_pattern = pattern::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        brand: Set(payload.brand.as_str().to_string()),
        version: Set(payload.version.as_str().to_string()),
        pattern_url: Set(payload.pattern_url),
        for_who: Set(payload.for_who.as_str().to_string()),
        category: Set(payload.category.map(|c| c.as_str().to_string())),
        difficulty: Set(payload.difficulty),
        fabric: Set(payload.fabric),
        fabric_amount: Set(payload.fabric_amount),
        owner_id: Set(auth_user.id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_pattern.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(PatternResponse::from(model))))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Patterns",
    operation_id = "updatePattern",
    summary = "Update a pattern",
    description = "Updates only the fields present in the body; nullable fields are cleared with \
        an explicit `null`. Attachment slots cannot be changed here. Bumps `updated_at`.",
    params(("id" = Uuid, Path, description = "Pattern ID")),
    request_body = UpdatePatternRequest,
    responses(
        (status = 200, description = "Pattern updated", body = PatternResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Pattern not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id = %id))]
pub async fn update_pattern(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdatePatternRequest>,
) -> Result<Json<PatternResponse>, AppError> {
    validate_update_pattern(&payload)?;

    let txn = state.db.begin().await?;

    let existing = find_pattern_for_update(&txn, id).await?;
    auth_user.require_owner(existing.owner_id)?;
    let mut active: pattern::ActiveModel = existing.into();

    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(brand.as_str().to_string());
    }
    if let Some(version) = payload.version {
        active.version = Set(version.as_str().to_string());
    }
    if let Some(url) = payload.pattern_url {
        active.pattern_url = Set(url);
    }
    if let Some(for_who) = payload.for_who {
        active.for_who = Set(for_who.as_str().to_string());
    }
    if let Some(category) = payload.category {
        active.category = Set(category.map(|c| c.as_str().to_string()));
    }
    if let Some(difficulty) = payload.difficulty {
        active.difficulty = Set(difficulty);
    }
    if let Some(fabric) = payload.fabric {
        active.fabric = Set(fabric);
    }
    if let Some(amount) = payload.fabric_amount {
        active.fabric_amount = Set(amount);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Patterns",
    operation_id = "deletePattern",
    summary = "Delete a pattern and its files",
    description = "Deletes every attached file, then the pattern. If any file cannot be deleted \
        the pattern is kept, still referencing only the files that remain, and the failing keys \
        are returned (CLEANUP_FAILED). Retrying is safe.",
    params(("id" = Uuid, Path, description = "Pattern ID")),
    responses(
        (status = 200, description = "Pattern deleted", body = Message),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Pattern not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Some files could not be deleted (CLEANUP_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn delete_pattern(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, AppError> {
    let txn = state.db.begin().await?;

    let existing = find_pattern_for_update(&txn, id).await?;
    auth_user.require_owner(existing.owner_id)?;

    let failed = purge_patterns(&txn, &state.attachments, vec![existing]).await?;
    txn.commit().await?;

    if !failed.is_empty() {
        return Err(AppError::CleanupFailed { keys: failed });
    }

    info!("Pattern deleted");
    Ok(Json(Message::new("Pattern deleted successfully")))
}

/// Release the attachments of locked patterns and delete their rows.
///
/// Each row is deleted inside a savepoint before its objects are touched, so
/// a database error can no longer strand a row whose objects are gone. A
/// pattern whose release partly failed has the savepoint rolled back and
/// keeps its row, with only the failed slots still set. Returns the keys that
/// could not be deleted; the caller must commit `txn` either way.
pub(crate) async fn purge_patterns(
    txn: &DatabaseTransaction,
    attachments: &AttachmentCoordinator,
    patterns: Vec<pattern::Model>,
) -> Result<Vec<String>, AppError> {
    let mut failed = Vec::new();

    for model in patterns {
        let savepoint = txn.begin().await?;
        pattern::Entity::delete_by_id(model.id)
            .exec(&savepoint)
            .await?;

        let slots = SlotMap::from_model(&model);
        match attachments.release_all_attachments(model.id, &slots).await {
            Ok(_) => savepoint.commit().await?,
            Err(err) => {
                savepoint.rollback().await?;
                failed.extend(err.failed_keys());
                let remaining = err.remaining();
                let mut active: pattern::ActiveModel = model.into();
                remaining.apply_to(&mut active);
                active.updated_at = Set(chrono::Utc::now());
                active.update(txn).await?;
            }
        }
    }

    Ok(failed)
}

pub(crate) async fn find_pattern<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<pattern::Model, AppError> {
    pattern::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pattern not found".into()))
}

/// Read a pattern with `SELECT ... FOR UPDATE`, serializing writers on the row.
pub(crate) async fn find_pattern_for_update(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> Result<pattern::Model, AppError> {
    pattern::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Pattern not found".into()))
}
