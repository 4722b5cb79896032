//! Search API endpoints.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::{success, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::search::{SearchScope, MAX_SEARCH_OFFSET};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Restrict results to one document.
    #[serde(default)]
    pub document_id: Option<String>,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search result with pages and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub document_id: String,
    pub segment_id: String,
    /// One-based page number
    pub page: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub snippet: String,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Full-text search over document pages.
pub async fn search_pages(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> ApiResult<SearchResponse> {
    // Limit the maximum number of results
    let limit = params.limit.min(MAX_SEARCH_LIMIT);
    if params.offset > MAX_SEARCH_OFFSET {
        return Err(AppError::BadRequest(format!(
            "offset cannot exceed {}",
            MAX_SEARCH_OFFSET
        )));
    }

    let scope = match params.document_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => SearchScope::Document(id),
        None => SearchScope::Library,
    };

    let found = state.search.search(&params.q, scope, limit, params.offset)?;

    let results = found
        .hits
        .into_iter()
        .map(|hit| SearchResultItem {
            document_id: hit.document_id,
            segment_id: hit.segment_id,
            page: hit.page_index + 1,
            title: hit.title,
            author: hit.author,
            snippet: hit.snippet,
            score: hit.score,
        })
        .collect();

    success(SearchResponse {
        results,
        total: found.total,
        limit,
        offset: params.offset,
    })
}
