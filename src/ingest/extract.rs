//! Plain-text extraction from stored documents.

use std::path::Path;

use pulldown_cmark::{Event, Parser, TagEnd};

use crate::errors::AppError;
use crate::models::FileType;

/// Extract the readable text of a stored file.
pub async fn extract_text(path: &Path, file_type: FileType) -> Result<String, AppError> {
    match file_type {
        FileType::Txt => {
            let bytes = tokio::fs::read(path).await?;
            Ok(decode_text(&bytes))
        }
        FileType::Md => {
            let bytes = tokio::fs::read(path).await?;
            Ok(markdown_to_text(&decode_text(&bytes)))
        }
        FileType::Pdf => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || pdf_to_text(&path))
                .await
                .map_err(|e| AppError::Internal(format!("PDF extraction task failed: {}", e)))?
        }
        FileType::Epub | FileType::Docx => Err(AppError::Unsupported(format!(
            "Text extraction is not supported for {} files",
            file_type.as_str()
        ))),
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences and dropping a leading BOM.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Render Markdown as plain text, keeping block boundaries as blank lines.
pub fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(end) if is_block_end(&end) => out.push_str("\n\n"),
            _ => {}
        }
    }

    out.trim().to_string()
}

fn is_block_end(end: &TagEnd) -> bool {
    matches!(
        end,
        TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock
    )
}

fn pdf_to_text(path: &Path) -> Result<String, AppError> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| AppError::Unsupported(format!("Could not parse PDF: {}", e)))?;

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        match doc.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => tracing::debug!("No text on PDF page {}: {}", page_number, e),
        }
    }

    if pages.is_empty() {
        return Err(AppError::Unsupported(
            "PDF contains no extractable text".to_string(),
        ));
    }

    Ok(pages.join("\n\n"))
}
