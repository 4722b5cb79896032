//! Upload validation: allowed extensions and the size ceiling.

use std::path::Path;

use crate::errors::AppError;
use crate::models::FileType;

/// Resolve the file type of an uploaded file name, rejecting anything outside the allow-list.
pub fn validate_extension(file_name: &str) -> Result<FileType, AppError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    FileType::from_extension(ext).ok_or_else(|| {
        let allowed: Vec<&str> = FileType::ALL.iter().map(|t| t.as_str()).collect();
        AppError::Validation(format!(
            "Unsupported file type '{}'. Allowed: {}",
            file_name,
            allowed.join(", ")
        ))
    })
}

/// Reject sizes over `max_bytes`.
pub fn validate_size(size: u64, max_bytes: u64) -> Result<(), AppError> {
    if size > max_bytes {
        return Err(AppError::Validation(format!(
            "File too large: maximum size is {} MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}
