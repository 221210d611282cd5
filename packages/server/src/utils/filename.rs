/// Why a client-supplied upload filename was rejected.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    NullByte,
    ControlCharacter,
    TooLong,
}

impl FilenameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::TooLong => "Invalid filename: must be at most 255 characters",
        }
    }
}

/// Validate the filename of an uploaded part and reduce it to its base name.
///
/// Some clients send the full local path (`C:\Users\me\dress.pdf`); only
/// the last component is kept. Only the extension survives into the stored
/// key, but the name still ends up in logs, so anything that could forge a
/// log line is refused. An empty name is allowed and means the part carries
/// no file.
pub fn validate_upload_filename(filename: &str) -> Result<&str, FilenameError> {
    if filename.contains('\0') {
        return Err(FilenameError::NullByte);
    }
    if filename.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename).trim();
    if base.chars().count() > 255 {
        return Err(FilenameError::TooLong);
    }

    Ok(base)
}

/// `Content-Disposition` value offering `key` as a download.
///
/// Keys are already restricted to `[A-Za-z0-9._-]`, so no quoting is needed.
pub fn attachment_disposition(key: &str) -> String {
    format!("attachment; filename={key}")
}
