//! Local user records mirrored from the external identity provider.

use serde::{Deserialize, Serialize};

/// A user known to the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Identity assigned by the auth provider
    pub auth_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for `POST /api/user/sync`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserRequest {
    #[serde(default)]
    pub auth_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request body for the admin user deletion endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// What an admin user deletion removed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedUser {
    pub user_id: String,
    pub annotations_deleted: u64,
    pub bookmarks_deleted: u64,
}
