//! Prompt context rendering.
//!
//! Each retrieved chunk becomes a numbered block: a one-line source header
//! followed by the chunk text. Blocks are separated by [`CHUNK_DELIMITER`].

use crate::models::{RetrievedChunk, SourceType};

/// Returned in place of context when retrieval found nothing.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant knowledge base content found for this query.";

/// Separator placed between rendered chunks.
pub const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// Render chunks, in order, into one prompt-ready string.
///
/// ```rust
/// use pmmsherpa_core::context::{format_context_for_prompt, NO_CONTEXT_SENTINEL};
///
/// assert_eq!(format_context_for_prompt(&[]), NO_CONTEXT_SENTINEL);
/// ```
pub fn format_context_for_prompt(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    chunks
        .iter()
        .enumerate()
        .map(|(idx, chunk)| {
            format!(
                "[Source {}] {}\n{}",
                idx + 1,
                source_header(chunk),
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join(CHUNK_DELIMITER)
}

/// `"<title>" by <author> (<qualifier>)`, omitting whatever is missing.
pub fn source_header(chunk: &RetrievedChunk) -> String {
    let mut parts: Vec<String> = vec![format!("\"{}\"", chunk.document_title)];

    if let Some(author) = non_blank(chunk.author.as_deref()) {
        parts.push(format!("by {}", author));
    }

    match chunk.source_type {
        SourceType::Book => {
            if let Some(page) = chunk.page_number.filter(|p| *p != 0) {
                parts.push(format!("(Page {})", page));
            }
        }
        SourceType::Blog => parts.push("(PMA Blog)".to_string()),
        SourceType::Ama => {
            parts.push("(Sharebird AMA)".to_string());
            if let Some(question) = non_blank(chunk.question.as_deref()) {
                parts.push(format!("Q: \"{}\"", question));
            }
        }
    }

    parts.join(" ")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
