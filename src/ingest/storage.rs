//! Writes uploaded files into the upload directory.

use std::path::Path;

use axum::extract::multipart::Field;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use super::validate::validate_size;
use crate::errors::AppError;

/// A file persisted in the upload directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Name inside the upload directory
    pub file_name: String,
    pub size: u64,
}

/// Stream a multipart field to disk, enforcing the size ceiling while reading.
///
/// The partial file is removed when the upload turns out empty or too large.
pub async fn store_field(
    mut field: Field<'_>,
    upload_dir: &Path,
    original_name: &str,
    max_bytes: u64,
) -> Result<StoredFile, AppError> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let file_name = stored_name(original_name);
    let path = upload_dir.join(&file_name);

    // create_new: never clobber another upload
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;

    let mut size = 0u64;
    let written: Result<(), AppError> = async {
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            validate_size(size, max_bytes)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        if size == 0 {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        Ok(())
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(remove_err) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove partial upload {:?}: {}", path, remove_err);
        }
        return Err(e);
    }

    tracing::info!("Stored upload {} ({} bytes)", file_name, size);

    Ok(StoredFile { file_name, size })
}

/// Remove a stored file, ignoring files that are already gone.
pub async fn remove_stored_file(upload_dir: &Path, file_name: &str) -> Result<(), AppError> {
    match tokio::fs::remove_file(upload_dir.join(sanitize_file_name(file_name))).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Collision-resistant name: millisecond timestamp, random discriminator, sanitized original.
pub fn stored_name(original_name: &str) -> String {
    let discriminator = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        Utc::now().timestamp_millis(),
        &discriminator[..8],
        sanitize_file_name(original_name)
    )
}

/// Strip directory components and any character outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
