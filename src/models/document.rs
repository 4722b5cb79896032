//! Document model and the file types the library accepts.

use serde::{Deserialize, Serialize};

/// File formats accepted by the upload endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Epub,
    Txt,
    Docx,
    Md,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Pdf,
        FileType::Epub,
        FileType::Txt,
        FileType::Docx,
        FileType::Md,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Epub => "epub",
            FileType::Txt => "txt",
            FileType::Docx => "docx",
            FileType::Md => "md",
        }
    }

    /// Resolve a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == ext)
    }
}

/// A document in the library, uploaded or entered by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// Name of the stored file inside the upload directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub page_count: i64,
    pub word_count: i64,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
    /// Whether processing may guess the language
    #[serde(default)]
    pub auto_detect: bool,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Everything the repository needs to insert a document row.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: String,
    pub author_id: Option<String>,
    pub file_type: Option<FileType>,
    pub original_name: Option<String>,
    pub file_name: Option<String>,
    pub file_size: i64,
    pub language: Option<String>,
    pub genre: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub auto_detect: bool,
}

/// Request body for entering a document by hand.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for updating document metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    /// Author name, resolved to an author record
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Response body of a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub title: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: FileType,
    /// Whether segmentation was scheduled in the background
    pub processing: bool,
}

/// Library listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryQuery {
    /// Case-insensitive title substring
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Aggregate numbers about the whole library.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub document_count: i64,
    pub processed_count: i64,
    pub author_count: i64,
    pub total_words: i64,
}

/// One page of the library listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryPage {
    pub documents: Vec<Document>,
    /// Number of documents matching the filters, ignoring limit/offset
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub stats: LibraryStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_extension("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_extension("md"), Some(FileType::Md));
        assert_eq!(FileType::from_extension("exe"), None);
        assert_eq!(FileType::from_extension(""), None);
    }

    #[test]
    fn test_file_type_serializes_lowercase() {
        let json = serde_json::to_string(&FileType::Docx).unwrap();
        assert_eq!(json, "\"docx\"");
    }
}
