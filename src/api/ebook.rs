//! Ebook reader API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{EbookPage, EbookQuery, ReadingProgress, UpdateProgressRequest};
use crate::AppState;

/// GET /api/ebook/:id?page=N - Get one reconstructed page (1-based).
pub async fn get_ebook_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<EbookQuery>,
) -> ApiResult<EbookPage> {
    let document = state.repo.require_document(&id).await?;

    if query.page < 1 {
        return Err(AppError::Validation(
            "page must be 1 or greater".to_string(),
        ));
    }
    if !document.processed {
        return Err(AppError::Conflict(format!(
            "Document {} has not been processed yet",
            id
        )));
    }
    if query.page > document.page_count {
        return Err(AppError::NotFound(format!(
            "Page {} not found, document has {} pages",
            query.page, document.page_count
        )));
    }

    let segment = state
        .repo
        .get_segment(&id, query.page - 1)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Page {} not found", query.page)))?;

    success(EbookPage::from_segment(
        segment,
        document.title,
        document.author_name,
        document.page_count,
    ))
}

/// GET /api/ebook/:id/progress - Get the saved reading position.
pub async fn get_reading_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReadingProgress> {
    let document = state.repo.require_document(&id).await?;

    let progress = match state.repo.get_progress(&id).await? {
        Some((page, updated_at)) => {
            ReadingProgress::new(id, page, document.page_count, Some(updated_at))
        }
        None => ReadingProgress::new(id, 1, document.page_count, None),
    };

    success(progress)
}

/// PUT /api/ebook/:id - Save the reading position.
pub async fn update_reading_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateProgressRequest>,
) -> ApiResult<ReadingProgress> {
    let document = state.repo.require_document(&id).await?;

    let page = request
        .current_page
        .ok_or_else(|| AppError::Validation("currentPage is required".to_string()))?;
    if page < 1 {
        return Err(AppError::Validation(
            "currentPage must be 1 or greater".to_string(),
        ));
    }
    if document.processed && page > document.page_count {
        return Err(AppError::Validation(format!(
            "currentPage {} is past the last page ({})",
            page, document.page_count
        )));
    }

    let updated_at = state.repo.save_progress(&id, page).await?;

    success(ReadingProgress::new(
        id,
        page,
        document.page_count,
        Some(updated_at),
    ))
}
