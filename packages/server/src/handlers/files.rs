use axum::Json;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use chrono::Utc;
use common::storage::validate_key;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use tokio_util::io::ReaderStream;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::attachments::{AttachmentSlot, IncomingFile, IncomingFiles, SlotMap};
use crate::entity::pattern;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::pattern::find_pattern_for_update;
use crate::models::pattern::{PatternResponse, UploadForm};
use crate::state::AppState;
use crate::utils::filename::{attachment_disposition, validate_upload_filename};

/// Room for one full-size file per slot plus the form overhead.
pub fn upload_body_limit(max_file_size: u64) -> DefaultBodyLimit {
    let total = max_file_size
        .saturating_mul(AttachmentSlot::ALL.len() as u64)
        .saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(total).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Patterns",
    operation_id = "uploadPatternFiles",
    summary = "Upload files to a pattern's attachment slots",
    description = "Multipart form with the pattern `id` and up to one file per slot. Parts that \
        are absent or empty leave their slot unchanged. Each new file is stored under a fresh \
        key before the file it replaces is deleted, so a failed upload never leaves a slot \
        pointing at a missing file. Uploads to the same pattern are serialized.",
    request_body(content_type = "multipart/form-data", content = UploadForm),
    responses(
        (status = 200, description = "Updated pattern", body = PatternResponse),
        (status = 400, description = "Bad form, unknown part, duplicate slot or oversized file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Pattern not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Object store failure; names the slot (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(pattern_id = tracing::field::Empty))]
pub async fn upload_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PatternResponse>, AppError> {
    // Read and validate the whole body before taking the row lock.
    let form = read_upload_form(&mut multipart, state.config.storage.max_file_size).await?;
    tracing::Span::current().record("pattern_id", tracing::field::display(form.id));

    let txn = state.db.begin().await?;
    let existing = find_pattern_for_update(&txn, form.id).await?;
    auth_user.require_owner(existing.owner_id)?;

    if form.files.is_empty() {
        return Ok(Json(existing.into()));
    }

    let current = SlotMap::from_model(&existing);
    let staged = state
        .attachments
        .stage_uploads(existing.id, &current, form.files)
        .await?;

    let mut active: pattern::ActiveModel = existing.into();
    staged.slots().apply_to(&mut active);
    active.updated_at = Set(Utc::now());

    let persisted = match active.update(&txn).await {
        Ok(model) => txn.commit().await.map(|()| model),
        Err(e) => Err(e),
    };
    let model = match persisted {
        Ok(model) => model,
        Err(e) => {
            let left = state.attachments.abort(staged).await;
            if !left.is_empty() {
                warn!(keys = ?left, "New attachments orphaned after failed commit");
            }
            return Err(e.into());
        }
    };

    let outcome = state.attachments.finalize(staged).await;
    info!(
        replaced = outcome.replaced.len(),
        orphaned = outcome.orphaned.len(),
        "Attachments uploaded"
    );

    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "Patterns",
    operation_id = "downloadPatternFile",
    summary = "Download an attachment by key",
    description = "Streams the stored object as `application/octet-stream` with an attachment \
        `Content-Disposition` naming the key.",
    params(("filename" = String, Path, description = "Object key, as stored in a slot")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed key (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No such file (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Object store failure (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(filename = %filename))]
pub async fn download_file(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let key = validate_key(&filename)?;
    let reader = state.store.get_stream(key).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, attachment_disposition(key))
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

struct ParsedUpload {
    id: Uuid,
    files: IncomingFiles,
}

async fn read_upload_form(
    multipart: &mut Multipart,
    max_file_size: u64,
) -> Result<ParsedUpload, AppError> {
    let mut id = None;
    let mut files = IncomingFiles::new();
    let mut seen: Vec<AttachmentSlot> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "id" {
            if id.is_some() {
                return Err(AppError::Validation("Duplicate 'id' field".into()));
            }
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read id: {e}")))?;
            let parsed = Uuid::parse_str(text.trim())
                .map_err(|_| AppError::Validation("Invalid pattern id".into()))?;
            id = Some(parsed);
            continue;
        }

        let slot = AttachmentSlot::from_form_field(&name)
            .ok_or_else(|| AppError::Validation(format!("Unknown form field '{name}'")))?;
        if seen.contains(&slot) {
            return Err(AppError::Validation(format!(
                "Duplicate file for '{name}'"
            )));
        }
        seen.push(slot);

        let original_name = validate_upload_filename(field.file_name().unwrap_or_default())
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();
        let bytes = read_field_bytes(field, &name, max_file_size).await?;
        files.insert(slot, IncomingFile::new(original_name, bytes));
    }

    let id = id.ok_or_else(|| AppError::Validation("Missing 'id' field".into()))?;
    Ok(ParsedUpload { id, files })
}

async fn read_field_bytes(
    mut field: Field<'_>,
    name: &str,
    max_size: u64,
) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (bytes.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::Validation(format!(
                "File for '{name}' exceeds maximum size of {max_size} bytes"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
