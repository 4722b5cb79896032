//! Author persona chat.
//!
//! The persona answers in the first person by quoting the most relevant pages of the
//! author's own documents from the search index.

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Author, ChatRequest, ChatResponse, ChatSource};
use crate::search::{SearchHit, SearchIndex, SearchScope};

/// Most passages quoted in one reply.
const MAX_QUOTES: usize = 3;
/// Longest quoted passage.
const QUOTE_CHARS: usize = 280;

/// Answer a chat message as the requested author.
pub async fn chat(
    repo: &Repository,
    search: &SearchIndex,
    request: &ChatRequest,
) -> Result<ChatResponse, AppError> {
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::Validation("message is required".to_string()))?;

    let author = find_author(repo, request).await?;
    let hits = search.search_lenient(message, SearchScope::Author(&author.id), MAX_QUOTES)?;

    tracing::debug!(
        "Persona {} answered with {} passages",
        author.name,
        hits.len()
    );

    Ok(compose_reply(&author, &hits))
}

async fn find_author(repo: &Repository, request: &ChatRequest) -> Result<Author, AppError> {
    let author_id = request.author_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let author_name = request
        .author_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match (author_id, author_name) {
        (Some(id), _) => repo
            .get_author(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id))),
        (None, Some(name)) => repo
            .find_author_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author '{}' not found", name))),
        (None, None) => Err(AppError::Validation(
            "authorId or authorName is required".to_string(),
        )),
    }
}

/// Build the persona's reply from retrieved pages.
pub fn compose_reply(author: &Author, hits: &[SearchHit]) -> ChatResponse {
    let quoted: Vec<&SearchHit> = hits.iter().take(MAX_QUOTES).collect();

    let reply = if quoted.is_empty() {
        format!(
            "Soy {}. No he escrito sobre eso en ninguno de los textos de esta biblioteca.",
            author.name
        )
    } else {
        let mut reply = format!("Soy {}. Esto es lo que escribí al respecto:", author.name);
        for hit in &quoted {
            reply.push_str(&format!(
                "\n\n«{}»\n({}, página {})",
                quote(&hit.snippet),
                hit.title,
                hit.page_index + 1
            ));
        }
        reply
    };

    let sources = quoted
        .iter()
        .map(|hit| ChatSource {
            document_id: hit.document_id.clone(),
            title: hit.title.clone(),
            page: hit.page_index + 1,
            segment_id: hit.segment_id.clone(),
        })
        .collect();

    ChatResponse {
        author_id: author.id.clone(),
        author_name: author.name.clone(),
        reply,
        sources,
    }
}

/// Collapse whitespace and cut at a word boundary.
fn quote(snippet: &str) -> String {
    let collapsed = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= QUOTE_CHARS {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(QUOTE_CHARS).collect();
    let cut = match cut.rfind(' ') {
        Some(pos) => &cut[..pos],
        None => cut.as_str(),
    };
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::{IndexedSegment, NewDocument, Segment};
    use tempfile::TempDir;

    fn author() -> Author {
        Author {
            id: "a1".to_string(),
            name: "Rosario Castellanos".to_string(),
            description: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            document_count: 1,
        }
    }

    fn hit(page_index: i64, snippet: &str) -> SearchHit {
        SearchHit {
            segment_id: format!("s{}", page_index),
            document_id: "d1".to_string(),
            page_index,
            title: "Balún Canán".to_string(),
            author: Some("Rosario Castellanos".to_string()),
            snippet: snippet.to_string(),
            score: 1.0,
        }
    }

    #[test]
    fn test_reply_without_passages() {
        let response = compose_reply(&author(), &[]);
        assert!(response.reply.contains("No he escrito"));
        assert!(response.sources.is_empty());
    }

    #[test]
    fn test_reply_quotes_at_most_three_pages() {
        let hits: Vec<SearchHit> = (0..5).map(|i| hit(i, "la  memoria\nde la tierra")).collect();
        let response = compose_reply(&author(), &hits);

        assert_eq!(response.sources.len(), 3);
        assert_eq!(response.sources[0].page, 1);
        assert!(response.reply.contains("«la memoria de la tierra»"));
        assert!(response.reply.contains("(Balún Canán, página 3)"));
        assert!(!response.reply.contains("página 4"));
    }

    #[test]
    fn test_quote_cuts_long_passages() {
        let long = "palabra ".repeat(100);
        let quoted = quote(&long);
        assert!(quoted.ends_with('…'));
        assert!(quoted.chars().count() <= QUOTE_CHARS + 1);
    }

    #[tokio::test]
    async fn test_chat_requires_message_and_author() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::new(init_database(&dir.path().join("t.sqlite")).await.unwrap());
        let search = SearchIndex::open(&dir.path().join("index")).unwrap();

        let no_message = chat(
            &repo,
            &search,
            &ChatRequest {
                author_name: Some("Nadie".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(no_message, Err(AppError::Validation(_))));

        let unknown = chat(
            &repo,
            &search,
            &ChatRequest {
                author_name: Some("Nadie".to_string()),
                message: Some("hola".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_chat_quotes_author_pages() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::new(init_database(&dir.path().join("t.sqlite")).await.unwrap());
        let search = SearchIndex::open(&dir.path().join("index")).unwrap();

        let author = repo.resolve_author("Rosario Castellanos").await.unwrap();
        let doc = repo
            .create_document(&NewDocument {
                title: "Balún Canán".to_string(),
                author_id: Some(author.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();

        search
            .rebuild(&[IndexedSegment {
                segment: Segment {
                    id: "s0".to_string(),
                    document_id: doc.id.clone(),
                    page_index: 0,
                    content: "Los indios tienen la memoria de los antiguos".to_string(),
                    word_count: 8,
                },
                title: doc.title.clone(),
                author_id: Some(author.id.clone()),
                author_name: Some(author.name.clone()),
            }])
            .await
            .unwrap();

        let response = chat(
            &repo,
            &search,
            &ChatRequest {
                author_id: Some(author.id.clone()),
                message: Some("¿Qué es la memoria?".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(response.author_name, "Rosario Castellanos");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].document_id, doc.id);
        assert!(response.reply.contains("memoria"));
    }
}
