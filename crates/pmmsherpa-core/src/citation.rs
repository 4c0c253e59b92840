//! Citations attached to assistant messages.
//!
//! [`extract_citations`] is 1:1 with the retrieved chunks. Dedup and
//! grouping are presentation concerns, provided separately by
//! [`dedup_citations`] and [`group_citations`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{RetrievedChunk, SourceType};

/// Source name used when a document has a blank title.
pub const UNTITLED_SOURCE: &str = "Untitled source";

/// Display-ready provenance of one retrieved chunk.
///
/// Field names match the persisted message format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub source_type: SourceType,
    pub author: Option<String>,
    pub url: Option<String>,
    pub page_number: Option<i32>,
    pub section_title: Option<String>,
    pub question: Option<String>,
    #[serde(default)]
    pub speaker_role: Option<String>,
}

impl Citation {
    /// Key used to collapse repeated citations: (source, author, page).
    pub fn dedup_key(&self) -> (String, Option<String>, Option<i32>) {
        (self.source.clone(), self.author.clone(), self.page_number)
    }

    /// One-line rendering, e.g. `Obviously Awesome by April Dunford (Page 12)`.
    pub fn display_line(&self) -> String {
        let mut line = self.source.clone();
        if let Some(author) = &self.author {
            line.push_str(&format!(" by {}", author));
        }
        if let Some(page) = self.page_number {
            line.push_str(&format!(" (Page {})", page));
        }
        if let Some(section) = &self.section_title {
            line.push_str(&format!(" - {}", section));
        }
        if let Some(question) = &self.question {
            line.push_str(&format!(" \u{201c}{}\u{201d}", question));
        }
        line
    }
}

impl From<&RetrievedChunk> for Citation {
    fn from(chunk: &RetrievedChunk) -> Self {
        let source = if chunk.document_title.trim().is_empty() {
            UNTITLED_SOURCE.to_string()
        } else {
            chunk.document_title.clone()
        };

        Citation {
            source,
            source_type: chunk.source_type,
            author: chunk.author.clone(),
            url: chunk.url.clone(),
            page_number: chunk.page_number,
            section_title: chunk.section_title.clone(),
            question: chunk.question.clone(),
            speaker_role: None,
        }
    }
}

/// One citation per chunk, in the same order.
pub fn extract_citations(chunks: &[RetrievedChunk]) -> Vec<Citation> {
    chunks.iter().map(Citation::from).collect()
}

/// Keep the first citation for each (source, author, page) key, preserving order.
pub fn dedup_citations(citations: &[Citation]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    citations
        .iter()
        .filter(|c| seen.insert(c.dedup_key()))
        .cloned()
        .collect()
}

/// Citations of one source type, for grouped presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationGroup {
    pub source_type: SourceType,
    pub label: &'static str,
    pub citations: Vec<Citation>,
}

/// Group by source type; groups appear in order of first occurrence.
pub fn group_citations(citations: &[Citation]) -> Vec<CitationGroup> {
    let mut groups: Vec<CitationGroup> = Vec::new();

    for citation in citations {
        match groups
            .iter_mut()
            .find(|g| g.source_type == citation.source_type)
        {
            Some(group) => group.citations.push(citation.clone()),
            None => groups.push(CitationGroup {
                source_type: citation.source_type,
                label: citation.source_type.label(),
                citations: vec![citation.clone()],
            }),
        }
    }

    groups
}
