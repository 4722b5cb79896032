//! Annotation API endpoints.

use axum::extract::{Path, State};

use super::{required, success, ApiJson, ApiQuery, ApiResult};
use crate::db::NewAnnotation;
use crate::errors::AppError;
use crate::models::{
    Annotation, AnnotationQuery, CreateAnnotationRequest, UpdateAnnotationRequest,
};
use crate::AppState;

/// GET /api/annotations - List annotations, optionally for one document page.
pub async fn list_annotations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnnotationQuery>,
) -> ApiResult<Vec<Annotation>> {
    success(state.repo.list_annotations(&query).await?)
}

/// GET /api/annotations/:id - Get a single annotation.
pub async fn get_annotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Annotation> {
    match state.repo.get_annotation(&id).await? {
        Some(annotation) => success(annotation),
        None => Err(AppError::NotFound(format!("Annotation {} not found", id))),
    }
}

/// POST /api/annotations - Create an annotation.
pub async fn create_annotation(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateAnnotationRequest>,
) -> ApiResult<Annotation> {
    // Validate required fields
    let document_id = required(&request.document_id, "documentId")?;
    let segment_id = required(&request.segment_id, "segmentId")?;
    let color = required(&request.color, "color")?;
    let page_index = request.page_index.unwrap_or(0);
    if page_index < 0 {
        return Err(AppError::Validation(
            "pageIndex must be zero or greater".to_string(),
        ));
    }

    state.repo.require_document(document_id).await?;

    let annotation = state
        .repo
        .create_annotation(&NewAnnotation {
            document_id: document_id.to_string(),
            user_id: request.user_id.clone(),
            segment_id: segment_id.to_string(),
            page_index,
            color: color.to_string(),
            content: request.content.clone(),
            selected_text: request.selected_text.clone(),
        })
        .await?;

    success(annotation)
}

/// PUT /api/annotations/:id - Update an annotation.
pub async fn update_annotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateAnnotationRequest>,
) -> ApiResult<Annotation> {
    if matches!(request.color.as_deref().map(str::trim), Some("")) {
        return Err(AppError::Validation("color cannot be empty".to_string()));
    }
    if matches!(request.segment_id.as_deref().map(str::trim), Some("")) {
        return Err(AppError::Validation(
            "segmentId cannot be empty".to_string(),
        ));
    }
    if request.page_index.is_some_and(|p| p < 0) {
        return Err(AppError::Validation(
            "pageIndex must be zero or greater".to_string(),
        ));
    }

    success(state.repo.update_annotation(&id, &request).await?)
}

/// DELETE /api/annotations/:id - Delete an annotation.
pub async fn delete_annotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_annotation(&id).await?;
    success(())
}
