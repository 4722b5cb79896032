//! Author persona chat payloads.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A passage the persona quoted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSource {
    pub document_id: String,
    pub title: String,
    /// One-based page number
    pub page: i64,
    pub segment_id: String,
}

/// The persona's answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub author_id: String,
    pub author_name: String,
    pub reply: String,
    pub sources: Vec<ChatSource>,
}
