//! Upload API endpoint.

use axum::extract::{Multipart, State};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::ingest::storage::{remove_stored_file, store_field, StoredFile};
use crate::ingest::validate::validate_extension;
use crate::ingest::{file_stem, metadata_from_file_name};
use crate::models::{FileType, NewDocument, UploadResponse};
use crate::AppState;

/// The multipart form of an upload.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    author: Option<String>,
    title: Option<String>,
    language: Option<String>,
    genre: Option<String>,
    auto_detect: bool,
}

#[derive(Debug)]
struct UploadedFile {
    stored: StoredFile,
    original_name: String,
    file_type: FileType,
}

/// POST /api/upload - Upload a document file.
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut form = read_form(&state, multipart).await?;
    let file = form
        .file
        .take()
        .ok_or_else(|| AppError::Validation("file is required".to_string()))?;

    match register(&state, &form, &file).await {
        Ok(response) => success(response),
        Err(e) => {
            discard(&state, &file.stored).await;
            Err(e)
        }
    }
}

/// Read every form field, streaming the file part to disk as it arrives.
async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    let result: Result<(), AppError> = async {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    if form.file.is_some() {
                        return Err(AppError::Validation(
                            "Only one file per upload is accepted".to_string(),
                        ));
                    }
                    let original_name = field
                        .file_name()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .ok_or_else(|| {
                            AppError::Validation("Uploaded file has no name".to_string())
                        })?;
                    // Reject before a single byte hits the disk
                    let file_type = validate_extension(&original_name)?;
                    let stored = store_field(
                        field,
                        &state.config.upload_dir,
                        &original_name,
                        state.config.max_upload_bytes,
                    )
                    .await?;
                    form.file = Some(UploadedFile {
                        stored,
                        original_name,
                        file_type,
                    });
                }
                "author" => form.author = text_value(field.text().await?),
                "title" => form.title = text_value(field.text().await?),
                "language" => form.language = text_value(field.text().await?),
                "genre" => form.genre = text_value(field.text().await?),
                "autoDetect" => {
                    let value = field.text().await?;
                    form.auto_detect = matches!(value.trim(), "true" | "1" | "on");
                }
                other => tracing::debug!("Ignoring upload form field '{}'", other),
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        if let Some(file) = &form.file {
            discard(state, &file.stored).await;
        }
        return Err(e);
    }

    Ok(form)
}

/// Create the author and document rows and schedule processing.
async fn register(
    state: &AppState,
    form: &UploadForm,
    file: &UploadedFile,
) -> Result<UploadResponse, AppError> {
    let (guessed_author, guessed_title) = if form.auto_detect {
        metadata_from_file_name(&file.original_name)
    } else {
        (None, file_stem(&file.original_name).to_string())
    };

    let author_name = form.author.clone().or(guessed_author);
    let title = form.title.clone().unwrap_or(guessed_title);
    if title.is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }

    let author_id = match &author_name {
        Some(name) => Some(state.repo.resolve_author(name).await?.id),
        None => None,
    };

    let document = state
        .repo
        .create_document(&NewDocument {
            title,
            author_id,
            file_type: Some(file.file_type),
            original_name: Some(file.original_name.clone()),
            file_name: Some(file.stored.file_name.clone()),
            file_size: file.stored.size as i64,
            language: form.language.clone(),
            genre: form.genre.clone(),
            auto_detect: form.auto_detect,
            ..Default::default()
        })
        .await?;

    tracing::info!(
        "Uploaded {} as document {} ({} bytes)",
        file.original_name,
        document.id,
        file.stored.size
    );

    let processing = state.config.process_on_upload;
    if processing {
        let processor = state.processor.clone();
        let document_id = document.id.clone();
        tokio::spawn(async move {
            // Failures are recorded on the document by the processor
            let _ = processor.process(&document_id).await;
        });
    }

    Ok(UploadResponse {
        document_id: document.id,
        author_id: document.author_id,
        title: document.title,
        file_name: file.stored.file_name.clone(),
        file_size: document.file_size,
        file_type: file.file_type,
        processing,
    })
}

async fn discard(state: &AppState, stored: &StoredFile) {
    if let Err(e) = remove_stored_file(&state.config.upload_dir, &stored.file_name).await {
        tracing::warn!("Failed to remove upload {}: {}", stored.file_name, e);
    }
}

fn text_value(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
