//! Document API endpoints.

use axum::extract::{Path, State};

use super::{required, success, ApiJson, ApiResult};
use crate::ingest::storage::remove_stored_file;
use crate::models::{CreateDocumentRequest, Document, NewDocument, UpdateDocumentRequest};
use crate::AppState;

/// GET /api/documents - List all documents.
pub async fn list_documents(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    success(state.repo.list_documents().await?)
}

/// GET /api/documents/:id - Get a single document.
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    success(state.repo.require_document(&id).await?)
}

/// POST /api/documents - Enter a document by hand, without a file.
pub async fn create_document(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateDocumentRequest>,
) -> ApiResult<Document> {
    let title = required(&request.title, "title")?;

    let author_id = match request.author.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(state.repo.resolve_author(name).await?.id),
        _ => None,
    };

    let document = state
        .repo
        .create_document(&NewDocument {
            title: title.to_string(),
            author_id,
            language: request.language,
            genre: request.genre,
            tags: request.tags.unwrap_or_default(),
            description: request.description,
            ..Default::default()
        })
        .await?;

    tracing::info!("Created document {} ({})", document.id, document.title);
    success(document)
}

/// PUT /api/documents/:id - Update document metadata.
pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateDocumentRequest>,
) -> ApiResult<Document> {
    let document = state.repo.update_document(&id, &request).await?;

    // Title and author are part of every indexed page
    if document.processed {
        match state.repo.list_indexable_segments(Some(&id)).await {
            Ok(segments) => {
                if let Err(e) = state.search.index_document(&id, &segments).await {
                    tracing::warn!("Failed to re-index document {}: {}", id, e);
                }
            }
            Err(e) => tracing::warn!("Failed to load pages of document {}: {}", id, e),
        }
    }

    success(document)
}

/// DELETE /api/documents/:id - Delete a document with its pages, notes and stored file.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let document = state.repo.delete_document(&id).await?;

    if let Err(e) = state.search.remove_document(&id).await {
        tracing::warn!("Failed to remove document {} from index: {}", id, e);
    }
    if let Some(file_name) = &document.file_name {
        if let Err(e) = remove_stored_file(&state.config.upload_dir, file_name).await {
            tracing::warn!("Failed to remove stored file {}: {}", file_name, e);
        }
    }

    tracing::info!("Deleted document {}", id);
    success(())
}

/// POST /api/documents/:id/process - Extract, paginate and index a document now.
pub async fn process_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    // Detection only fills a language the document does not have yet
    success(state.processor.process(&id).await?)
}
