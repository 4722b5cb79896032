//! Bookmark API endpoints.

use axum::extract::{Path, State};

use super::{required, success, ApiJson, ApiQuery, ApiResult};
use crate::db::NewBookmark;
use crate::errors::AppError;
use crate::models::{Bookmark, BookmarkQuery, CreateBookmarkRequest, UpdateBookmarkRequest};
use crate::AppState;

/// GET /api/bookmarks - List bookmarks by page.
pub async fn list_bookmarks(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookmarkQuery>,
) -> ApiResult<Vec<Bookmark>> {
    success(state.repo.list_bookmarks(&query).await?)
}

/// POST /api/bookmarks - Create a bookmark.
pub async fn create_bookmark(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBookmarkRequest>,
) -> ApiResult<Bookmark> {
    let document_id = required(&request.document_id, "documentId")?;
    let page_index = match request.page_index {
        Some(page_index) if page_index >= 0 => page_index,
        Some(_) => {
            return Err(AppError::Validation(
                "pageIndex must be zero or greater".to_string(),
            ));
        }
        None => return Err(AppError::Validation("pageIndex is required".to_string())),
    };

    state.repo.require_document(document_id).await?;

    let bookmark = state
        .repo
        .create_bookmark(&NewBookmark {
            document_id: document_id.to_string(),
            user_id: request.user_id.clone(),
            segment_id: request.segment_id.clone(),
            page_index,
            title: request.title.clone(),
            note: request.note.clone(),
        })
        .await?;

    success(bookmark)
}

/// PUT /api/bookmarks/:id - Update a bookmark.
pub async fn update_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateBookmarkRequest>,
) -> ApiResult<Bookmark> {
    success(state.repo.update_bookmark(&id, &request).await?)
}

/// DELETE /api/bookmarks/:id - Delete a bookmark.
pub async fn delete_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_bookmark(&id).await?;
    success(())
}
