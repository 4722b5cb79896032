//! User mirror and admin user deletion.

use sqlx::Row;

use super::repository::now;
use super::Repository;
use crate::errors::AppError;
use crate::models::{DeletedUser, User};

const USER_COLUMNS: &str = "id, auth_id, email, display_name, created_at, updated_at";

impl Repository {
    /// Create or refresh the local record of an authenticated user.
    pub async fn sync_user(
        &self,
        auth_id: &str,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<User, AppError> {
        let now = now();

        sqlx::query(
            r#"INSERT INTO users (id, auth_id, email, display_name, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(auth_id) DO UPDATE SET
                   email = excluded.email,
                   display_name = COALESCE(excluded.display_name, users.display_name),
                   updated_at = excluded.updated_at"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(auth_id)
        .bind(email)
        .bind(display_name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {} FROM users WHERE auth_id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(auth_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user_from_row(&row))
    }

    /// Get a user by local ID or auth ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = ?1 OR auth_id = ?1",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    /// Remove a user with every annotation and bookmark they own, all or nothing.
    ///
    /// Annotations may reference either the local ID or the auth ID.
    pub async fn delete_user(&self, id: &str) -> Result<DeletedUser, AppError> {
        let user = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let mut tx = self.pool.begin().await?;

        let annotations = sqlx::query("DELETE FROM annotations WHERE user_id IN (?, ?)")
            .bind(&user.id)
            .bind(&user.auth_id)
            .execute(&mut *tx)
            .await?;

        let bookmarks = sqlx::query("DELETE FROM bookmarks WHERE user_id IN (?, ?)")
            .bind(&user.id)
            .bind(&user.auth_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(DeletedUser {
            user_id: user.id,
            annotations_deleted: annotations.rows_affected(),
            bookmarks_deleted: bookmarks.rows_affected(),
        })
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        auth_id: row.get("auth_id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, NewAnnotation, NewBookmark};
    use crate::models::NewDocument;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sync_user_upserts() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&temp_dir.path().join("test.sqlite"))
                .await
                .unwrap(),
        );

        let first = repo
            .sync_user("auth|42", "old@example.com", Some("Alfonsina"))
            .await
            .unwrap();
        let second = repo
            .sync_user("auth|42", "new@example.com", None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "new@example.com");
        assert_eq!(second.display_name.as_deref(), Some("Alfonsina"));
    }

    #[tokio::test]
    async fn test_delete_user_removes_owned_rows() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&temp_dir.path().join("test.sqlite"))
                .await
                .unwrap(),
        );
        let user = repo
            .sync_user("auth|7", "lector@example.com", None)
            .await
            .unwrap();
        let doc = repo
            .create_document(&NewDocument {
                title: "Residencia en la tierra".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        for owner in [Some(user.id.clone()), Some("someone-else".to_string())] {
            repo.create_annotation(&NewAnnotation {
                document_id: doc.id.clone(),
                user_id: owner.clone(),
                segment_id: "seg".to_string(),
                page_index: 0,
                color: "yellow".to_string(),
                content: None,
                selected_text: None,
            })
            .await
            .unwrap();
            repo.create_bookmark(&NewBookmark {
                document_id: doc.id.clone(),
                user_id: owner,
                segment_id: None,
                page_index: 3,
                title: None,
                note: None,
            })
            .await
            .unwrap();
        }

        let deleted = repo.delete_user(&user.id).await.unwrap();
        assert_eq!(deleted.annotations_deleted, 1);
        assert_eq!(deleted.bookmarks_deleted, 1);
        assert!(repo.get_user(&user.id).await.unwrap().is_none());

        let remaining = repo
            .list_annotations(&Default::default())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);

        assert!(matches!(
            repo.delete_user(&user.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
