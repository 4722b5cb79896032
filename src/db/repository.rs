//! Database repository for documents and authors.
//!
//! Segment, annotation and user operations live in sibling modules as further `impl` blocks.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Author, Document, FileType, LibraryQuery, LibraryStats, NewDocument, UpdateDocumentRequest,
};

/// Default page size of the library listing.
pub const DEFAULT_LIBRARY_LIMIT: i64 = 50;
/// Largest page size of the library listing.
pub const MAX_LIBRARY_LIMIT: i64 = 200;

const DOCUMENT_SELECT: &str = r#"SELECT d.id, d.title, d.author_id, a.name AS author_name,
           d.file_type, d.original_name, d.file_name, d.file_size, d.language, d.genre,
           d.tags, d.description, d.page_count, d.word_count, d.processed,
           d.processing_error, d.auto_detect, d.created_at, d.updated_at, d.version
    FROM documents d LEFT JOIN authors a ON a.id = d.author_id"#;

const LIBRARY_FILTER: &str = r#"WHERE (?1 IS NULL OR d.title LIKE '%' || ?1 || '%' ESCAPE '\')
      AND (?2 IS NULL OR d.author_id = ?2)
      AND (?3 IS NULL OR d.language = ?3)
      AND (?4 IS NULL OR d.genre = ?4)"#;

const AUTHOR_SELECT: &str = r#"SELECT a.id, a.name, a.description, a.created_at,
           (SELECT COUNT(*) FROM documents d WHERE d.author_id = a.id) AS document_count
    FROM authors a"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== AUTHOR OPERATIONS ====================

    /// Find an author by name, creating it when missing.
    pub async fn resolve_author(&self, name: &str) -> Result<Author, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Author name is required".to_string()));
        }

        sqlx::query(
            "INSERT INTO authors (id, name, created_at) VALUES (?, ?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(name)
        .bind(now())
        .execute(&self.pool)
        .await?;

        self.find_author_by_name(name)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Author {} vanished after upsert", name)))
    }

    /// List all authors with their document counts.
    pub async fn list_authors(&self) -> Result<Vec<Author>, AppError> {
        let sql = format!("{} ORDER BY a.name", AUTHOR_SELECT);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(author_from_row).collect())
    }

    /// Get an author by ID.
    pub async fn get_author(&self, id: &str) -> Result<Option<Author>, AppError> {
        let sql = format!("{} WHERE a.id = ?", AUTHOR_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(author_from_row))
    }

    /// Get an author by exact name.
    pub async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>, AppError> {
        let sql = format!("{} WHERE a.name = ?", AUTHOR_SELECT);
        let row = sqlx::query(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(author_from_row))
    }

    // ==================== DOCUMENT OPERATIONS ====================

    /// List all documents, newest first.
    pub async fn list_documents(&self) -> Result<Vec<Document>, AppError> {
        let sql = format!("{} ORDER BY d.created_at DESC, d.id", DOCUMENT_SELECT);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    /// Get a document by ID.
    pub async fn get_document(&self, id: &str) -> Result<Option<Document>, AppError> {
        let sql = format!("{} WHERE d.id = ?", DOCUMENT_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    /// Get a document by ID, failing with `NotFound` when missing.
    pub async fn require_document(&self, id: &str) -> Result<Document, AppError> {
        self.get_document(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))
    }

    /// Insert a document row with zeroed page and word counts.
    pub async fn create_document(&self, new: &NewDocument) -> Result<Document, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();
        let tags_json = serde_json::to_string(&new.tags)?;

        sqlx::query(
            r#"INSERT INTO documents (
                id, title, author_id, file_type, original_name, file_name, file_size,
                language, genre, tags, description, page_count, word_count, processed,
                processing_error, auto_detect, created_at, updated_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, NULL, ?, ?, ?, 1)"#,
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.author_id)
        .bind(new.file_type.map(|t| t.as_str()))
        .bind(&new.original_name)
        .bind(&new.file_name)
        .bind(new.file_size)
        .bind(&new.language)
        .bind(&new.genre)
        .bind(&tags_json)
        .bind(&new.description)
        .bind(new.auto_detect)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.require_document(&id).await
    }

    /// Update document metadata with optimistic concurrency control.
    pub async fn update_document(
        &self,
        id: &str,
        request: &UpdateDocumentRequest,
    ) -> Result<Document, AppError> {
        let existing = self.require_document(id).await?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict(format!(
                    "Version mismatch: expected {}, current {}",
                    expected, existing.version
                )));
            }
        }

        let author_id = match request.author.as_deref().map(str::trim) {
            Some("") => None,
            Some(name) => Some(self.resolve_author(name).await?.id),
            None => existing.author_id.clone(),
        };

        let title = match request.title.as_deref().map(str::trim) {
            Some("") => {
                return Err(AppError::Validation("Title cannot be empty".to_string()));
            }
            Some(title) => title.to_string(),
            None => existing.title.clone(),
        };
        let language = request.language.clone().or(existing.language.clone());
        let genre = request.genre.clone().or(existing.genre.clone());
        let tags = request.tags.clone().unwrap_or(existing.tags.clone());
        let description = request.description.clone().or(existing.description.clone());
        let tags_json = serde_json::to_string(&tags)?;

        // Conditional UPDATE with version check to prevent lost updates
        let result = sqlx::query(
            r#"UPDATE documents SET title = ?, author_id = ?, language = ?, genre = ?, tags = ?,
                   description = ?, updated_at = ?, version = version + 1
               WHERE id = ? AND version = ?"#,
        )
        .bind(&title)
        .bind(&author_id)
        .bind(&language)
        .bind(&genre)
        .bind(&tags_json)
        .bind(&description)
        .bind(now())
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Concurrent modification detected".to_string(),
            ));
        }

        self.require_document(id).await
    }

    /// Delete a document; segments, annotations, bookmarks and progress cascade.
    ///
    /// Returns the deleted row so the caller can clean up the stored file.
    pub async fn delete_document(&self, id: &str) -> Result<Document, AppError> {
        let existing = self.require_document(id).await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Document {} not found", id)));
        }

        Ok(existing)
    }

    /// Record why processing failed and drop the pages of any earlier run.
    pub async fn mark_processing_failed(&self, id: &str, message: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM segments WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"UPDATE documents SET processed = 0, page_count = 0, word_count = 0,
                   processing_error = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(message)
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== LIBRARY ====================

    /// Filtered, paged document listing. Returns the page and the unpaged match count.
    pub async fn library(&self, query: &LibraryQuery) -> Result<(Vec<Document>, i64), AppError> {
        let title = non_empty(&query.q).map(escape_like);
        let title = title.as_deref();
        let author_id = non_empty(&query.author_id);
        let language = non_empty(&query.language);
        let genre = non_empty(&query.genre);
        let (limit, offset) = library_window(query);

        let sql = format!(
            "{} {} ORDER BY d.created_at DESC, d.id LIMIT ?5 OFFSET ?6",
            DOCUMENT_SELECT, LIBRARY_FILTER
        );
        let rows = sqlx::query(&sql)
            .bind(title)
            .bind(author_id)
            .bind(language)
            .bind(genre)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) AS total FROM documents d {}", LIBRARY_FILTER);
        let total: i64 = sqlx::query(&count_sql)
            .bind(title)
            .bind(author_id)
            .bind(language)
            .bind(genre)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        Ok((rows.iter().map(document_from_row).collect(), total))
    }

    /// Aggregate numbers about the whole library.
    pub async fn library_stats(&self) -> Result<LibraryStats, AppError> {
        let row = sqlx::query(
            r#"SELECT
                (SELECT COUNT(*) FROM documents) AS document_count,
                (SELECT COUNT(*) FROM documents WHERE processed = 1) AS processed_count,
                (SELECT COUNT(*) FROM authors) AS author_count,
                (SELECT COALESCE(SUM(word_count), 0) FROM documents) AS total_words"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LibraryStats {
            document_count: row.get("document_count"),
            processed_count: row.get("processed_count"),
            author_count: row.get("author_count"),
            total_words: row.get("total_words"),
        })
    }
}

/// Current time as an RFC 3339 string, the timestamp format of every table.
pub(super) fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Clamp the library window to sane bounds.
pub fn library_window(query: &LibraryQuery) -> (i64, i64) {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIBRARY_LIMIT)
        .clamp(1, MAX_LIBRARY_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    (limit, offset)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Escape `LIKE` wildcards so user input matches literally under `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Helper functions for row conversion

fn author_from_row(row: &sqlx::sqlite::SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        document_count: row.get("document_count"),
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Document {
    let processed: i32 = row.get("processed");
    let auto_detect: i32 = row.get("auto_detect");
    let file_type: Option<String> = row.get("file_type");
    let tags: Option<String> = row.get("tags");

    Document {
        id: row.get("id"),
        title: row.get("title"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        file_type: file_type.and_then(|t| FileType::from_extension(&t)),
        original_name: row.get("original_name"),
        file_name: row.get("file_name"),
        file_size: row.get("file_size"),
        language: row.get("language"),
        genre: row.get("genre"),
        tags: tags.map(|s| parse_json_array(&s)).unwrap_or_default(),
        description: row.get("description"),
        page_count: row.get("page_count"),
        word_count: row.get("word_count"),
        processed: processed != 0,
        processing_error: row.get("processing_error"),
        auto_detect: auto_detect != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
