//! Author model.

use serde::{Deserialize, Serialize};

/// A writer referenced by one or more documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    /// Number of documents referencing this author
    #[serde(default)]
    pub document_count: i64,
}
