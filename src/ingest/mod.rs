//! Document ingestion: upload validation, file storage, text extraction and pagination.
//!
//! The [`Processor`] turns a stored upload into pages in the database and the search index.

pub mod extract;
pub mod language;
pub mod paginate;
pub mod storage;
pub mod validate;

pub use paginate::{PageText, Paginator};

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::Document;
use crate::search::SearchIndex;

/// Stem of an uploaded file name, ignoring any client-side directories.
pub fn file_stem(original_name: &str) -> &str {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.trim().is_empty() => stem,
        _ => base,
    };
    stem.trim()
}

/// Guess author and title from a file name shaped like `Author - Title.ext`.
///
/// Without the separator the whole stem becomes the title.
pub fn metadata_from_file_name(original_name: &str) -> (Option<String>, String) {
    let stem = file_stem(original_name);

    if let Some((author, title)) = stem.split_once(" - ") {
        let (author, title) = (author.trim(), title.trim());
        if !author.is_empty() && !title.is_empty() {
            return (Some(author.to_string()), title.to_string());
        }
    }

    (None, stem.to_string())
}

/// Runs extraction, pagination, language detection and indexing for stored documents.
pub struct Processor {
    repo: Arc<Repository>,
    search: Arc<SearchIndex>,
    upload_dir: PathBuf,
    paginator: Paginator,
}

impl Processor {
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>, config: &Config) -> Self {
        Self {
            repo,
            search,
            upload_dir: config.upload_dir.clone(),
            paginator: Paginator::new(config.words_per_page),
        }
    }

    /// Process a document's stored file and return the refreshed document.
    ///
    /// The language is only guessed for documents uploaded with auto-detection on.
    /// Failures are recorded on the document, and any pages from an earlier run are
    /// dropped from the database and the index, before the error is returned.
    pub async fn process(&self, document_id: &str) -> Result<Document, AppError> {
        let document = self.repo.require_document(document_id).await?;

        let (file_name, file_type) = match (&document.file_name, document.file_type) {
            (Some(file_name), Some(file_type)) => (file_name.clone(), file_type),
            _ => {
                return Err(AppError::Conflict(format!(
                    "Document {} has no stored file to process",
                    document_id
                )));
            }
        };

        match self
            .run(document_id, &file_name, file_type, document.auto_detect)
            .await
        {
            Ok(page_count) => {
                tracing::info!(
                    "Processed document {} into {} pages",
                    document_id,
                    page_count
                );
                self.repo.require_document(document_id).await
            }
            Err(e) => {
                tracing::warn!("Processing document {} failed: {}", document_id, e);
                if let Err(mark_err) = self
                    .repo
                    .mark_processing_failed(document_id, e.message())
                    .await
                {
                    tracing::error!(
                        "Failed to record processing error for {}: {}",
                        document_id,
                        mark_err
                    );
                }
                if let Err(index_err) = self.search.remove_document(document_id).await {
                    tracing::error!(
                        "Failed to drop index entries for {}: {}",
                        document_id,
                        index_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        document_id: &str,
        file_name: &str,
        file_type: crate::models::FileType,
        detect: bool,
    ) -> Result<usize, AppError> {
        let path = self.upload_dir.join(file_name);
        let text = extract::extract_text(&path, file_type).await?;

        let pages = self.paginator.paginate(&text);
        if pages.is_empty() {
            return Err(AppError::Unsupported(
                "Document contains no readable text".to_string(),
            ));
        }

        let language = if detect {
            language::detect_language(&text)
        } else {
            None
        };

        self.repo
            .replace_segments(document_id, &pages, language)
            .await?;

        let indexed = self.repo.list_indexable_segments(Some(document_id)).await?;
        self.search.index_document(document_id, &indexed).await?;

        Ok(pages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::{FileType, NewDocument};
    use crate::search::SearchScope;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("C:\\libros\\Rayuela.epub"), "Rayuela");
        assert_eq!(file_stem("a/b/El.Aleph.txt"), "El.Aleph");
        assert_eq!(file_stem(".md"), ".md");
    }

    #[test]
    fn test_metadata_from_file_name() {
        assert_eq!(
            metadata_from_file_name("Jorge Luis Borges - Ficciones.pdf"),
            (Some("Jorge Luis Borges".to_string()), "Ficciones".to_string())
        );
        assert_eq!(
            metadata_from_file_name("uploads/notas_de_viaje.md"),
            (None, "notas_de_viaje".to_string())
        );
        assert_eq!(
            metadata_from_file_name(" - Sin autor.txt"),
            (None, "- Sin autor".to_string())
        );
    }

    struct Fixture {
        processor: Processor,
        repo: Arc<Repository>,
        search: Arc<SearchIndex>,
        upload_dir: PathBuf,
        _dir: TempDir,
    }

    async fn fixture(words_per_page: usize) -> Fixture {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(Repository::new(
            init_database(&dir.path().join("test.sqlite")).await.unwrap(),
        ));
        let search = Arc::new(SearchIndex::open(&dir.path().join("index")).unwrap());
        let upload_dir = dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).unwrap();

        let processor = Processor {
            repo: repo.clone(),
            search: search.clone(),
            upload_dir: upload_dir.clone(),
            paginator: Paginator::new(words_per_page),
        };

        Fixture {
            processor,
            repo,
            search,
            upload_dir,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_process_text_document() {
        let fx = fixture(5).await;
        std::fs::write(
            fx.upload_dir.join("cuento.txt"),
            "El tiempo es la sustancia de que estoy hecho.\n\nEl tiempo es un río que me arrebata.",
        )
        .unwrap();

        let doc = fx
            .repo
            .create_document(&NewDocument {
                title: "Nueva refutación del tiempo".to_string(),
                file_type: Some(FileType::Txt),
                file_name: Some("cuento.txt".to_string()),
                auto_detect: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let processed = fx.processor.process(&doc.id).await.unwrap();
        assert!(processed.processed);
        assert_eq!(processed.word_count, 17);
        assert_eq!(processed.page_count, 4);
        assert_eq!(processed.language.as_deref(), Some("es"));

        let hits = fx
            .search
            .search("río", SearchScope::Document(&doc.id), 10, 0)
            .unwrap()
            .hits;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page_index, 2);
    }

    #[tokio::test]
    async fn test_process_records_failure() {
        let fx = fixture(300).await;
        std::fs::write(fx.upload_dir.join("vacio.txt"), "   \n\n  ").unwrap();

        let doc = fx
            .repo
            .create_document(&NewDocument {
                title: "Vacío".to_string(),
                file_type: Some(FileType::Txt),
                file_name: Some("vacio.txt".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = fx.processor.process(&doc.id).await;
        assert!(matches!(result, Err(AppError::Unsupported(_))));

        let doc = fx.repo.require_document(&doc.id).await.unwrap();
        assert!(!doc.processed);
        assert!(doc.processing_error.is_some());
    }

    #[tokio::test]
    async fn test_process_without_file_conflicts() {
        let fx = fixture(300).await;
        let doc = fx
            .repo
            .create_document(&NewDocument {
                title: "Entrada manual".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = fx.processor.process(&doc.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_process_keeps_language_unset_without_auto_detect() {
        let fx = fixture(50).await;
        std::fs::write(
            fx.upload_dir.join("poema.txt"),
            "Puedo escribir los versos más tristes esta noche, la noche está estrellada.",
        )
        .unwrap();

        let doc = fx
            .repo
            .create_document(&NewDocument {
                title: "Poema 20".to_string(),
                file_type: Some(FileType::Txt),
                file_name: Some("poema.txt".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let processed = fx.processor.process(&doc.id).await.unwrap();
        assert!(processed.processed);
        assert!(!processed.auto_detect);
        assert!(processed.language.is_none());
    }

    #[tokio::test]
    async fn test_failed_reprocess_drops_previous_pages() {
        let fx = fixture(5).await;
        let path = fx.upload_dir.join("cuento.txt");
        std::fs::write(&path, "El tiempo es un río que me arrebata, pero yo soy el río.").unwrap();

        let doc = fx
            .repo
            .create_document(&NewDocument {
                title: "Nueva refutación del tiempo".to_string(),
                file_type: Some(FileType::Txt),
                file_name: Some("cuento.txt".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let first = fx.processor.process(&doc.id).await.unwrap();
        assert!(first.page_count > 0);
        assert!(!fx
            .search
            .search("río", SearchScope::Document(&doc.id), 10, 0)
            .unwrap()
            .hits
            .is_empty());

        std::fs::write(&path, "  \n\n ").unwrap();
        let result = fx.processor.process(&doc.id).await;
        assert!(matches!(result, Err(AppError::Unsupported(_))));

        let doc = fx.repo.require_document(&doc.id).await.unwrap();
        assert!(!doc.processed);
        assert_eq!(doc.page_count, 0);
        assert_eq!(doc.word_count, 0);
        assert!(doc.processing_error.is_some());
        assert!(fx.repo.get_segment(&doc.id, 0).await.unwrap().is_none());
        assert!(fx
            .repo
            .list_indexable_segments(Some(&doc.id))
            .await
            .unwrap()
            .is_empty());
        assert!(fx
            .search
            .search("río", SearchScope::Document(&doc.id), 10, 0)
            .unwrap()
            .hits
            .is_empty());
    }
}
