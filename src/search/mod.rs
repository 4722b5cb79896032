//! Tantivy-based search index module.
//!
//! Indexes every stored page (segment) with its document title and author, with field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::snippet::SnippetGenerator;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::IndexedSegment;

/// Field boost values.
const BOOST_TITLE: f32 = 3.0;
const BOOST_AUTHOR: f32 = 2.0;
const BOOST_CONTENT: f32 = 1.0;

/// Longest snippet returned with a hit.
const SNIPPET_CHARS: usize = 240;

/// Deepest result window a search may page to.
pub const MAX_SEARCH_OFFSET: usize = 10_000;

/// A matching page with its relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub segment_id: String,
    pub document_id: String,
    /// Zero-based page index
    pub page_index: i64,
    pub title: String,
    pub author: Option<String>,
    pub snippet: String,
    pub score: f32,
}

/// One window of hits plus the number of pages matching overall.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total: usize,
}

/// Restricts a search to part of the library.
#[derive(Debug, Clone, Copy)]
pub enum SearchScope<'a> {
    Library,
    Document(&'a str),
    Author(&'a str),
}

/// Search index schema fields.
struct SearchFields {
    segment_id: Field,
    document_id: Field,
    author_id: Field,
    page_index: Field,
    title: Field,
    author: Field,
    content: Field,
}

/// Tantivy search index over document pages.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let segment_id = schema_builder.add_text_field("segment_id", STRING | STORED);
        let document_id = schema_builder.add_text_field("document_id", STRING | STORED);
        let author_id = schema_builder.add_text_field("author_id", STRING);
        let page_index = schema_builder.add_u64_field("page_index", STORED);
        let title = schema_builder.add_text_field("title", TEXT | STORED);
        let author = schema_builder.add_text_field("author", TEXT | STORED);
        let content = schema_builder.add_text_field("content", TEXT | STORED);
        let schema = schema_builder.build();

        let fields = SearchFields {
            segment_id,
            document_id,
            author_id,
            page_index,
            title,
            author,
            content,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from stored segments.
    pub async fn rebuild(&self, segments: &[IndexedSegment]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for segment in segments {
            writer.add_document(self.create_document(segment))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} pages", segments.len());
        Ok(())
    }

    /// Replace all pages of one document.
    pub async fn index_document(
        &self,
        document_id: &str,
        segments: &[IndexedSegment],
    ) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.document_id, document_id));
        for segment in segments {
            writer.add_document(self.create_document(segment))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::debug!(
            "Indexed {} pages of document {}",
            segments.len(),
            document_id
        );
        Ok(())
    }

    /// Remove a document's pages from the index.
    pub async fn remove_document(&self, document_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.document_id, document_id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search pages matching a user query. Malformed queries are rejected.
    pub fn search(
        &self,
        query_str: &str,
        scope: SearchScope<'_>,
        limit: usize,
        offset: usize,
    ) -> Result<SearchResults, AppError> {
        if query_str.trim().is_empty() {
            return Ok(SearchResults::default());
        }

        // Validate the query once over all fields before building boosted per-field queries
        QueryParser::for_index(
            &self.index,
            vec![self.fields.title, self.fields.author, self.fields.content],
        )
        .parse_query(query_str)
        .map_err(|e| AppError::BadRequest(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in self.boosted_fields() {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        self.execute(subqueries, scope, limit, offset)
    }

    /// Lenient variant for free-form chat messages: syntax errors are ignored.
    pub fn search_lenient(
        &self,
        text: &str,
        scope: SearchScope<'_>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in self.boosted_fields() {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            let (field_query, _errors) = field_parser.parse_query_lenient(text);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }

        Ok(self.execute(subqueries, scope, limit, 0)?.hits)
    }

    fn boosted_fields(&self) -> [(Field, f32); 3] {
        [
            (self.fields.title, BOOST_TITLE),
            (self.fields.author, BOOST_AUTHOR),
            (self.fields.content, BOOST_CONTENT),
        ]
    }

    fn execute(
        &self,
        subqueries: Vec<(Occur, Box<dyn Query>)>,
        scope: SearchScope<'_>,
        limit: usize,
        offset: usize,
    ) -> Result<SearchResults, AppError> {
        if subqueries.is_empty() || limit == 0 {
            return Ok(SearchResults::default());
        }
        let offset = offset.min(MAX_SEARCH_OFFSET);

        let text_query: Box<dyn Query> = Box::new(BooleanQuery::new(subqueries));
        let query: Box<dyn Query> = match scope {
            SearchScope::Library => text_query,
            SearchScope::Document(id) => self.restrict(text_query, self.fields.document_id, id),
            SearchScope::Author(id) => self.restrict(text_query, self.fields.author_id, id),
        };

        let searcher = self.reader.searcher();
        let (top_docs, total) = searcher
            .search(
                &query,
                &(TopDocs::with_limit(limit.saturating_add(offset)), Count),
            )
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let mut snippets = SnippetGenerator::create(&searcher, &*query, self.fields.content)?;
        snippets.set_max_num_chars(SNIPPET_CHARS);

        let hits = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let text = |field: Field| -> Option<String> {
                    doc.get_first(field)
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                };

                let snippet = snippets.snippet_from_doc(&doc);
                let snippet = if snippet.fragment().trim().is_empty() {
                    text(self.fields.content)
                        .map(|c| c.chars().take(SNIPPET_CHARS).collect())
                        .unwrap_or_default()
                } else {
                    snippet.fragment().to_string()
                };

                Some(SearchHit {
                    segment_id: text(self.fields.segment_id)?,
                    document_id: text(self.fields.document_id)?,
                    page_index: doc
                        .get_first(self.fields.page_index)
                        .and_then(|v| v.as_u64())
                        .unwrap_or_default() as i64,
                    title: text(self.fields.title).unwrap_or_default(),
                    author: text(self.fields.author).filter(|a| !a.is_empty()),
                    snippet,
                    score,
                })
            })
            .collect();

        Ok(SearchResults { hits, total })
    }

    fn restrict(&self, query: Box<dyn Query>, field: Field, value: &str) -> Box<dyn Query> {
        let filter = TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        );
        Box::new(BooleanQuery::new(vec![
            (Occur::Must, query),
            (Occur::Must, Box::new(filter)),
        ]))
    }

    /// Create a Tantivy document from a segment.
    fn create_document(&self, indexed: &IndexedSegment) -> TantivyDocument {
        let segment = &indexed.segment;
        doc!(
            self.fields.segment_id => segment.id.clone(),
            self.fields.document_id => segment.document_id.clone(),
            self.fields.author_id => indexed.author_id.clone().unwrap_or_default(),
            self.fields.page_index => segment.page_index.max(0) as u64,
            self.fields.title => indexed.title.clone(),
            self.fields.author => indexed.author_name.clone().unwrap_or_default(),
            self.fields.content => segment.content.clone()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;
    use tempfile::TempDir;

    fn page(document_id: &str, author_id: &str, index: i64, content: &str) -> IndexedSegment {
        IndexedSegment {
            segment: Segment {
                id: format!("{}-{}", document_id, index),
                document_id: document_id.to_string(),
                page_index: index,
                content: content.to_string(),
                word_count: content.split_whitespace().count() as i64,
            },
            title: format!("Title of {}", document_id),
            author_id: Some(author_id.to_string()),
            author_name: Some(format!("Author {}", author_id)),
        }
    }

    #[tokio::test]
    async fn test_search_finds_page() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .rebuild(&[
                page("d1", "a1", 0, "the garden of forking paths"),
                page("d1", "a1", 1, "a labyrinth of symbols"),
                page("d2", "a2", 0, "one hundred years of solitude"),
            ])
            .await
            .unwrap();

        let results = index
            .search("labyrinth", SearchScope::Library, 10, 0)
            .unwrap();
        assert_eq!(results.total, 1);
        let hits = results.hits;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].segment_id, "d1-1");
        assert_eq!(hits[0].page_index, 1);
        assert!(hits[0].snippet.contains("labyrinth"));
    }

    #[tokio::test]
    async fn test_search_scopes() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .rebuild(&[
                page("d1", "a1", 0, "memory and time"),
                page("d2", "a2", 0, "time and solitude"),
            ])
            .await
            .unwrap();

        assert_eq!(
            index
                .search("time", SearchScope::Library, 10, 0)
                .unwrap()
                .hits
                .len(),
            2
        );

        let hits = index
            .search("time", SearchScope::Document("d2"), 10, 0)
            .unwrap()
            .hits;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "d2");

        let hits = index
            .search_lenient("time (((", SearchScope::Author("a1"), 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "d1");
    }

    #[tokio::test]
    async fn test_reindex_and_remove_document() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .index_document("d1", &[page("d1", "a1", 0, "first draft")])
            .await
            .unwrap();
        index
            .index_document("d1", &[page("d1", "a1", 0, "final version")])
            .await
            .unwrap();

        assert!(index
            .search("draft", SearchScope::Library, 10, 0)
            .unwrap()
            .hits
            .is_empty());
        assert_eq!(
            index
                .search("final", SearchScope::Library, 10, 0)
                .unwrap()
                .hits
                .len(),
            1
        );

        index.remove_document("d1").await.unwrap();
        assert!(index
            .search("final", SearchScope::Library, 10, 0)
            .unwrap()
            .hits
            .is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let results = index.search("", SearchScope::Library, 10, 0).unwrap();
        assert!(results.hits.is_empty());
        assert_eq!(results.total, 0);
    }

    #[tokio::test]
    async fn test_search_offset_past_every_hit() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();
        index
            .rebuild(&[page("d1", "a1", 0, "the garden of forking paths")])
            .await
            .unwrap();

        for offset in [5, 1 << 60, usize::MAX] {
            let results = index
                .search("garden", SearchScope::Library, 20, offset)
                .unwrap();
            assert_eq!(results.total, 1);
            assert!(results.hits.is_empty());
        }
    }
}
