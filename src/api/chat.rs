//! Author persona chat endpoint.

use axum::extract::State;

use super::{success, ApiJson, ApiResult};
use crate::models::{ChatRequest, ChatResponse};
use crate::persona;
use crate::AppState;

/// POST /api/chat - Ask an author a question.
pub async fn chat_with_author(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> ApiResult<ChatResponse> {
    success(persona::chat(&state.repo, &state.search, &request).await?)
}
