//! Segments, reconstructed ebook pages and reading progress.

use serde::{Deserialize, Serialize};

/// One stored page of a document's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub document_id: String,
    /// Zero-based position of the page inside the document
    pub page_index: i64,
    pub content: String,
    pub word_count: i64,
}

/// A segment together with the document fields the search index needs.
#[derive(Debug, Clone)]
pub struct IndexedSegment {
    pub segment: Segment,
    pub title: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
}

/// Query parameters of the ebook reader endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EbookQuery {
    /// One-based page number
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// A page of a document as shown by the reader.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EbookPage {
    pub document_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub current_page: i64,
    pub total_pages: i64,
    pub content: String,
    pub word_count: i64,
    pub segment_id: String,
    pub has_next: bool,
    pub has_previous: bool,
    /// Human readable position, e.g. "Página 5 de 12"
    pub page_label: String,
}

impl EbookPage {
    pub fn from_segment(
        segment: Segment,
        title: String,
        author: Option<String>,
        total_pages: i64,
    ) -> Self {
        let current_page = segment.page_index + 1;
        Self {
            document_id: segment.document_id,
            title,
            author,
            current_page,
            total_pages,
            content: segment.content,
            word_count: segment.word_count,
            segment_id: segment.id,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
            page_label: page_label(current_page, total_pages),
        }
    }
}

/// Format the reader's position label.
pub fn page_label(current_page: i64, total_pages: i64) -> String {
    format!("Página {} de {}", current_page, total_pages)
}

/// Request body for saving reading progress.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    #[serde(default)]
    pub current_page: Option<i64>,
}

/// Saved reading position for a document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub document_id: String,
    pub current_page: i64,
    pub total_pages: i64,
    /// Share of the document read, 0.0 to 100.0
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ReadingProgress {
    pub fn new(
        document_id: String,
        current_page: i64,
        total_pages: i64,
        updated_at: Option<String>,
    ) -> Self {
        let percent = if total_pages > 0 {
            (current_page as f64 / total_pages as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        Self {
            document_id,
            current_page,
            total_pages,
            percent,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(page_index: i64) -> Segment {
        Segment {
            id: format!("seg-{}", page_index),
            document_id: "doc".to_string(),
            page_index,
            content: "text".to_string(),
            word_count: 1,
        }
    }

    #[test]
    fn test_ebook_page_navigation_flags() {
        let first = EbookPage::from_segment(segment(0), "T".into(), None, 3);
        assert_eq!(first.current_page, 1);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = EbookPage::from_segment(segment(2), "T".into(), None, 3);
        assert_eq!(last.current_page, 3);
        assert!(!last.has_next);
        assert!(last.has_previous);
        assert_eq!(last.page_label, "Página 3 de 3");
    }

    #[test]
    fn test_progress_percent() {
        let progress = ReadingProgress::new("doc".into(), 1, 3, None);
        assert_eq!(progress.percent, 33.3);

        let empty = ReadingProgress::new("doc".into(), 1, 0, None);
        assert_eq!(empty.percent, 0.0);
    }
}
