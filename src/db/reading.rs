//! Segment storage and reading progress.

use sqlx::Row;

use super::repository::now;
use super::Repository;
use crate::errors::AppError;
use crate::ingest::PageText;
use crate::models::{IndexedSegment, Segment};

impl Repository {
    /// Atomically replace a document's pages and mark it processed.
    ///
    /// `detected_language` only fills the language when the document has none.
    pub async fn replace_segments(
        &self,
        document_id: &str,
        pages: &[PageText],
        detected_language: Option<&str>,
    ) -> Result<Vec<Segment>, AppError> {
        let word_count: usize = pages.iter().map(|p| p.word_count).sum();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE documents SET page_count = ?, word_count = ?, processed = 1,
                   processing_error = NULL, language = COALESCE(language, ?), updated_at = ?
               WHERE id = ?"#,
        )
        .bind(pages.len() as i64)
        .bind(word_count as i64)
        .bind(detected_language)
        .bind(now())
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }

        sqlx::query("DELETE FROM segments WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        let mut segments = Vec::with_capacity(pages.len());
        for page in pages {
            let segment = Segment {
                id: uuid::Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                page_index: page.index as i64,
                content: page.content.clone(),
                word_count: page.word_count as i64,
            };

            sqlx::query(
                "INSERT INTO segments (id, document_id, page_index, content, word_count) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&segment.id)
            .bind(&segment.document_id)
            .bind(segment.page_index)
            .bind(&segment.content)
            .bind(segment.word_count)
            .execute(&mut *tx)
            .await?;

            segments.push(segment);
        }

        tx.commit().await?;

        Ok(segments)
    }

    /// Get one page of a document by zero-based index.
    pub async fn get_segment(
        &self,
        document_id: &str,
        page_index: i64,
    ) -> Result<Option<Segment>, AppError> {
        let row = sqlx::query(
            "SELECT id, document_id, page_index, content, word_count FROM segments WHERE document_id = ? AND page_index = ?",
        )
        .bind(document_id)
        .bind(page_index)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(segment_from_row))
    }

    /// All pages ready for the search index, optionally restricted to one document.
    pub async fn list_indexable_segments(
        &self,
        document_id: Option<&str>,
    ) -> Result<Vec<IndexedSegment>, AppError> {
        let rows = sqlx::query(
            r#"SELECT s.id, s.document_id, s.page_index, s.content, s.word_count,
                      d.title, d.author_id, a.name AS author_name
               FROM segments s
               JOIN documents d ON d.id = s.document_id
               LEFT JOIN authors a ON a.id = d.author_id
               WHERE (?1 IS NULL OR s.document_id = ?1)
               ORDER BY s.document_id, s.page_index"#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| IndexedSegment {
                segment: segment_from_row(row),
                title: row.get("title"),
                author_id: row.get("author_id"),
                author_name: row.get("author_name"),
            })
            .collect())
    }

    /// Saved reading page of a document, if any.
    pub async fn get_progress(
        &self,
        document_id: &str,
    ) -> Result<Option<(i64, String)>, AppError> {
        let row = sqlx::query(
            "SELECT current_page, updated_at FROM reading_progress WHERE document_id = ?",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.get("current_page"), r.get("updated_at"))))
    }

    /// Store the reading page of a document (last write wins).
    pub async fn save_progress(
        &self,
        document_id: &str,
        current_page: i64,
    ) -> Result<String, AppError> {
        let now = now();
        sqlx::query(
            r#"INSERT INTO reading_progress (document_id, current_page, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(document_id) DO UPDATE SET current_page = excluded.current_page,
                                                      updated_at = excluded.updated_at"#,
        )
        .bind(document_id)
        .bind(current_page)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(now)
    }
}

fn segment_from_row(row: &sqlx::sqlite::SqliteRow) -> Segment {
    Segment {
        id: row.get("id"),
        document_id: row.get("document_id"),
        page_index: row.get("page_index"),
        content: row.get("content"),
        word_count: row.get("word_count"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::NewDocument;
    use tempfile::TempDir;

    fn pages(contents: &[&str]) -> Vec<PageText> {
        contents
            .iter()
            .enumerate()
            .map(|(index, content)| PageText {
                index,
                content: content.to_string(),
                word_count: content.split_whitespace().count(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replace_segments_updates_counts() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&temp_dir.path().join("t.sqlite"))
                .await
                .unwrap(),
        );
        let doc = repo
            .create_document(&NewDocument {
                title: "Pedro Páramo".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.replace_segments(&doc.id, &pages(&["uno dos", "tres"]), Some("es"))
            .await
            .unwrap();
        let segments = repo
            .replace_segments(&doc.id, &pages(&["a b c", "d", "e f"]), Some("en"))
            .await
            .unwrap();
        assert_eq!(segments.len(), 3);

        let doc = repo.require_document(&doc.id).await.unwrap();
        assert!(doc.processed);
        assert_eq!(doc.page_count, 3);
        assert_eq!(doc.word_count, 6);
        // First detection wins; later runs never overwrite a language.
        assert_eq!(doc.language.as_deref(), Some("es"));

        let second = repo.get_segment(&doc.id, 1).await.unwrap().unwrap();
        assert_eq!(second.content, "d");
        assert!(repo.get_segment(&doc.id, 3).await.unwrap().is_none());

        let indexable = repo.list_indexable_segments(Some(&doc.id)).await.unwrap();
        assert_eq!(indexable.len(), 3);
        assert_eq!(indexable[0].title, "Pedro Páramo");
    }

    #[tokio::test]
    async fn test_replace_segments_unknown_document() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&temp_dir.path().join("t.sqlite"))
                .await
                .unwrap(),
        );

        let result = repo.replace_segments("missing", &pages(&["x"]), None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_progress_upsert() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&temp_dir.path().join("t.sqlite"))
                .await
                .unwrap(),
        );
        let doc = repo
            .create_document(&NewDocument {
                title: "Ficciones".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(repo.get_progress(&doc.id).await.unwrap().is_none());
        repo.save_progress(&doc.id, 2).await.unwrap();
        repo.save_progress(&doc.id, 4).await.unwrap();
        let (page, _) = repo.get_progress(&doc.id).await.unwrap().unwrap();
        assert_eq!(page, 4);
    }
}
