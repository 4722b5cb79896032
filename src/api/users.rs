//! User sync and admin endpoints.

use axum::extract::State;

use super::{required, success, ApiJson, ApiResult};
use crate::models::{DeleteUserRequest, DeletedUser, SyncUserRequest, User};
use crate::AppState;

/// POST /api/user/sync - Create or refresh the local record of a signed-in user.
pub async fn sync_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SyncUserRequest>,
) -> ApiResult<User> {
    let auth_id = required(&request.auth_id, "authId")?;
    let email = required(&request.email, "email")?;
    let display_name = request
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let user = state.repo.sync_user(auth_id, email, display_name).await?;
    tracing::debug!("Synced user {}", user.id);
    success(user)
}

/// DELETE /api/admin/delete-user - Delete a user and everything they annotated.
pub async fn delete_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteUserRequest>,
) -> ApiResult<DeletedUser> {
    let user_id = required(&request.user_id, "userId")?;

    let deleted = state.repo.delete_user(user_id).await?;
    tracing::info!(
        "Deleted user {} with {} annotations and {} bookmarks",
        deleted.user_id,
        deleted.annotations_deleted,
        deleted.bookmarks_deleted
    );
    success(deleted)
}
