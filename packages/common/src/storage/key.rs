use uuid::Uuid;

use super::error::StorageError;

/// Maximum length of a file extension carried into a generated key.
pub const MAX_EXTENSION_LEN: usize = 16;

/// Maximum length of any object key accepted by the stores.
pub const MAX_KEY_LEN: usize = 128;

/// Generate a fresh object key for an uploaded file.
///
/// Keys have the form `<token>.<ext>`, where the token is a random UUID in
/// simple (32 hex chars) form and the extension is taken from the original
/// filename. Files without a usable extension get the bare token.
pub fn generate_key(original_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    match file_extension(original_name) {
        Some(ext) => format!("{token}.{ext}"),
        None => token,
    }
}

/// Extract a normalized (lowercase, ASCII alphanumeric) extension from a filename.
pub fn file_extension(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Validate a caller-supplied object key.
///
/// Keys are flat names: no separators, no traversal, no hidden files and
/// only `[A-Za-z0-9._-]`.
pub fn validate_key(key: &str) -> Result<&str, StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key cannot be empty".into()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(format!(
            "key exceeds {MAX_KEY_LEN} characters"
        )));
    }
    if key.starts_with('.') {
        return Err(StorageError::InvalidKey("key cannot start with '.'".into()));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(StorageError::InvalidKey(
            "key contains invalid characters (allowed: a-zA-Z0-9, ., -, _)".into(),
        ));
    }
    Ok(key)
}
