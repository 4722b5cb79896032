//! Library and author API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiQuery, ApiResult};
use crate::db::library_window;
use crate::errors::AppError;
use crate::models::{Author, LibraryPage, LibraryQuery};
use crate::AppState;

/// GET /api/library - Filtered, paged document listing with library stats.
pub async fn get_library(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LibraryQuery>,
) -> ApiResult<LibraryPage> {
    let (documents, total) = state.repo.library(&query).await?;
    let stats = state.repo.library_stats().await?;
    let (limit, offset) = library_window(&query);

    success(LibraryPage {
        documents,
        total,
        limit,
        offset,
        stats,
    })
}

/// GET /api/authors - List all authors.
pub async fn list_authors(State(state): State<AppState>) -> ApiResult<Vec<Author>> {
    success(state.repo.list_authors().await?)
}

/// GET /api/authors/:id - Get a single author.
pub async fn get_author(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Author> {
    match state.repo.get_author(&id).await? {
        Some(author) => success(author),
        None => Err(AppError::NotFound(format!("Author {} not found", id))),
    }
}
