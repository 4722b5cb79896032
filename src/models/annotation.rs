//! Annotation and bookmark models.

use serde::{Deserialize, Serialize};

/// A highlight or note attached to a position in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub segment_id: String,
    pub page_index: i64,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating an annotation.
///
/// Required fields are optional here so missing values surface as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnotationRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub page_index: Option<i64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub selected_text: Option<String>,
}

/// Request body for updating an annotation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnotationRequest {
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub page_index: Option<i64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub selected_text: Option<String>,
}

/// Filters for listing annotations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationQuery {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub page_index: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A saved reading position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
    pub page_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a bookmark.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookmarkRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub page_index: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Request body for updating a bookmark.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookmarkRequest {
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub page_index: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Filters for listing bookmarks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkQuery {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}
