//! Annotation and bookmark persistence.

use sqlx::Row;

use super::repository::now;
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Annotation, AnnotationQuery, Bookmark, BookmarkQuery, UpdateAnnotationRequest,
    UpdateBookmarkRequest,
};

const ANNOTATION_COLUMNS: &str = "id, document_id, user_id, segment_id, page_index, color, content, selected_text, created_at, updated_at";
const BOOKMARK_COLUMNS: &str =
    "id, document_id, user_id, segment_id, page_index, title, note, created_at, updated_at";

/// Fields of a validated annotation ready for insertion.
#[derive(Debug, Clone)]
pub struct NewAnnotation {
    pub document_id: String,
    pub user_id: Option<String>,
    pub segment_id: String,
    pub page_index: i64,
    pub color: String,
    pub content: Option<String>,
    pub selected_text: Option<String>,
}

/// Fields of a validated bookmark ready for insertion.
#[derive(Debug, Clone)]
pub struct NewBookmark {
    pub document_id: String,
    pub user_id: Option<String>,
    pub segment_id: Option<String>,
    pub page_index: i64,
    pub title: Option<String>,
    pub note: Option<String>,
}

impl Repository {
    // ==================== ANNOTATION OPERATIONS ====================

    /// List annotations in reading order.
    pub async fn list_annotations(
        &self,
        query: &AnnotationQuery,
    ) -> Result<Vec<Annotation>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM annotations
               WHERE (?1 IS NULL OR document_id = ?1)
                 AND (?2 IS NULL OR page_index = ?2)
                 AND (?3 IS NULL OR user_id = ?3)
               ORDER BY page_index, created_at, id"#,
            ANNOTATION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&query.document_id)
            .bind(query.page_index)
            .bind(&query.user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(annotation_from_row).collect())
    }

    /// Get an annotation by ID.
    pub async fn get_annotation(&self, id: &str) -> Result<Option<Annotation>, AppError> {
        let sql = format!("SELECT {} FROM annotations WHERE id = ?", ANNOTATION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(annotation_from_row))
    }

    /// Create an annotation.
    pub async fn create_annotation(&self, new: &NewAnnotation) -> Result<Annotation, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();

        sqlx::query(
            r#"INSERT INTO annotations (id, document_id, user_id, segment_id, page_index, color,
                   content, selected_text, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&new.document_id)
        .bind(&new.user_id)
        .bind(&new.segment_id)
        .bind(new.page_index)
        .bind(&new.color)
        .bind(&new.content)
        .bind(&new.selected_text)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.require_annotation(&id).await
    }

    /// Update an annotation; absent fields keep their value.
    pub async fn update_annotation(
        &self,
        id: &str,
        request: &UpdateAnnotationRequest,
    ) -> Result<Annotation, AppError> {
        let existing = self.require_annotation(id).await?;

        let segment_id = request.segment_id.clone().unwrap_or(existing.segment_id);
        let page_index = request.page_index.unwrap_or(existing.page_index);
        let color = request.color.clone().unwrap_or(existing.color);
        let content = request.content.clone().or(existing.content);
        let selected_text = request.selected_text.clone().or(existing.selected_text);

        sqlx::query(
            r#"UPDATE annotations SET segment_id = ?, page_index = ?, color = ?, content = ?,
                   selected_text = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&segment_id)
        .bind(page_index)
        .bind(&color)
        .bind(&content)
        .bind(&selected_text)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.require_annotation(id).await
    }

    /// Delete an annotation.
    pub async fn delete_annotation(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM annotations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Annotation {} not found", id)));
        }

        Ok(())
    }

    async fn require_annotation(&self, id: &str) -> Result<Annotation, AppError> {
        self.get_annotation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Annotation {} not found", id)))
    }

    // ==================== BOOKMARK OPERATIONS ====================

    /// List bookmarks ordered by page.
    pub async fn list_bookmarks(&self, query: &BookmarkQuery) -> Result<Vec<Bookmark>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM bookmarks
               WHERE (?1 IS NULL OR document_id = ?1)
                 AND (?2 IS NULL OR user_id = ?2)
               ORDER BY page_index, created_at, id"#,
            BOOKMARK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&query.document_id)
            .bind(&query.user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(bookmark_from_row).collect())
    }

    /// Get a bookmark by ID.
    pub async fn get_bookmark(&self, id: &str) -> Result<Option<Bookmark>, AppError> {
        let sql = format!("SELECT {} FROM bookmarks WHERE id = ?", BOOKMARK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(bookmark_from_row))
    }

    /// Create a bookmark.
    pub async fn create_bookmark(&self, new: &NewBookmark) -> Result<Bookmark, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();

        sqlx::query(
            r#"INSERT INTO bookmarks (id, document_id, user_id, segment_id, page_index, title, note,
                   created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&new.document_id)
        .bind(&new.user_id)
        .bind(&new.segment_id)
        .bind(new.page_index)
        .bind(&new.title)
        .bind(&new.note)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.require_bookmark(&id).await
    }

    /// Update a bookmark; absent fields keep their value.
    pub async fn update_bookmark(
        &self,
        id: &str,
        request: &UpdateBookmarkRequest,
    ) -> Result<Bookmark, AppError> {
        let existing = self.require_bookmark(id).await?;

        let page_index = request.page_index.unwrap_or(existing.page_index);
        if page_index < 0 {
            return Err(AppError::Validation(
                "pageIndex must be zero or greater".to_string(),
            ));
        }
        let segment_id = request.segment_id.clone().or(existing.segment_id);
        let title = request.title.clone().or(existing.title);
        let note = request.note.clone().or(existing.note);

        sqlx::query(
            r#"UPDATE bookmarks SET segment_id = ?, page_index = ?, title = ?, note = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&segment_id)
        .bind(page_index)
        .bind(&title)
        .bind(&note)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.require_bookmark(id).await
    }

    /// Delete a bookmark.
    pub async fn delete_bookmark(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Bookmark {} not found", id)));
        }

        Ok(())
    }

    async fn require_bookmark(&self, id: &str) -> Result<Bookmark, AppError> {
        self.get_bookmark(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Bookmark {} not found", id)))
    }
}

fn annotation_from_row(row: &sqlx::sqlite::SqliteRow) -> Annotation {
    Annotation {
        id: row.get("id"),
        document_id: row.get("document_id"),
        user_id: row.get("user_id"),
        segment_id: row.get("segment_id"),
        page_index: row.get("page_index"),
        color: row.get("color"),
        content: row.get("content"),
        selected_text: row.get("selected_text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn bookmark_from_row(row: &sqlx::sqlite::SqliteRow) -> Bookmark {
    Bookmark {
        id: row.get("id"),
        document_id: row.get("document_id"),
        user_id: row.get("user_id"),
        segment_id: row.get("segment_id"),
        page_index: row.get("page_index"),
        title: row.get("title"),
        note: row.get("note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::NewDocument;
    use tempfile::TempDir;

    async fn repo_with_document() -> (Repository, String, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&temp_dir.path().join("test.sqlite"))
                .await
                .unwrap(),
        );
        let doc = repo
            .create_document(&NewDocument {
                title: "Rayuela".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        (repo, doc.id, temp_dir)
    }

    fn annotation(document_id: &str, page_index: i64, color: &str) -> NewAnnotation {
        NewAnnotation {
            document_id: document_id.to_string(),
            user_id: Some("user-1".to_string()),
            segment_id: format!("seg-{}", page_index),
            page_index,
            color: color.to_string(),
            content: None,
            selected_text: Some("la Maga".to_string()),
        }
    }

    #[tokio::test]
    async fn test_annotation_crud() {
        let (repo, doc_id, _dir) = repo_with_document().await;

        let created = repo
            .create_annotation(&annotation(&doc_id, 2, "yellow"))
            .await
            .unwrap();
        repo.create_annotation(&annotation(&doc_id, 0, "green"))
            .await
            .unwrap();

        let all = repo
            .list_annotations(&AnnotationQuery {
                document_id: Some(doc_id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].page_index, 0);

        let on_page = repo
            .list_annotations(&AnnotationQuery {
                document_id: Some(doc_id.clone()),
                page_index: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(on_page.len(), 1);
        assert_eq!(on_page[0].id, created.id);

        let updated = repo
            .update_annotation(
                &created.id,
                &UpdateAnnotationRequest {
                    color: Some("blue".to_string()),
                    content: Some("¿Encontraría a la Maga?".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.color, "blue");
        assert_eq!(updated.selected_text.as_deref(), Some("la Maga"));

        repo.delete_annotation(&created.id).await.unwrap();
        assert!(matches!(
            repo.delete_annotation(&created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bookmarks_sorted_by_page() {
        let (repo, doc_id, _dir) = repo_with_document().await;

        for page_index in [7, 1, 4] {
            repo.create_bookmark(&NewBookmark {
                document_id: doc_id.clone(),
                user_id: None,
                segment_id: None,
                page_index,
                title: None,
                note: None,
            })
            .await
            .unwrap();
        }

        let bookmarks = repo
            .list_bookmarks(&BookmarkQuery {
                document_id: Some(doc_id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        let pages: Vec<i64> = bookmarks.iter().map(|b| b.page_index).collect();
        assert_eq!(pages, vec![1, 4, 7]);

        let invalid = repo
            .update_bookmark(
                &bookmarks[0].id,
                &UpdateBookmarkRequest {
                    page_index: Some(-1),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(invalid, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_document_delete_cascades() {
        let (repo, doc_id, _dir) = repo_with_document().await;

        let note = repo
            .create_annotation(&annotation(&doc_id, 0, "pink"))
            .await
            .unwrap();
        repo.delete_document(&doc_id).await.unwrap();

        assert!(repo.get_annotation(&note.id).await.unwrap().is_none());
    }
}
