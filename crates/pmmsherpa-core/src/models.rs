//! Core data models for the PMMSherpa knowledge base.
//!
//! [`Document`] and [`Chunk`] mirror the stored knowledge base. A
//! [`RetrievedChunk`] is the per-query projection returned by search, and a
//! [`RetrievalResult`] bundles those with an approximate token count.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Rough words-to-tokens multiplier used for context budgeting.
///
/// This is a heuristic, not a tokenizer. Counts derived from it are
/// estimates only.
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Kind of source a document was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A published PMM book.
    Book,
    /// A Product Marketing Alliance blog article.
    Blog,
    /// A Sharebird AMA transcript.
    Ama,
}

impl SourceType {
    /// Wire identifier (`"book"`, `"blog"`, `"ama"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Book => "book",
            SourceType::Blog => "blog",
            SourceType::Ama => "ama",
        }
    }

    /// Human-facing label used when presenting citations.
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Book => "Book",
            SourceType::Blog => "PMA Blog",
            SourceType::Ama => "AMA",
        }
    }

    /// Parse the wire identifier; `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "book" => Some(SourceType::Book),
            "blog" => Some(SourceType::Blog),
            "ama" => Some(SourceType::Ama),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source unit (book, blog post, AMA transcript).
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub source_type: SourceType,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub raw_text: String,
    pub word_count: usize,
    /// Hex SHA-256 of `raw_text`.
    pub content_hash: String,
}

impl Document {
    /// Create a document with a fresh id, computing word count and content hash.
    pub fn new(
        title: impl Into<String>,
        source_type: SourceType,
        raw_text: impl Into<String>,
    ) -> Self {
        let raw_text = raw_text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            author: None,
            source_type,
            url: None,
            tags: Vec::new(),
            word_count: word_count(&raw_text),
            content_hash: content_hash(&raw_text),
            raw_text,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A retrieval-sized segment of a [`Document`].
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub token_count: usize,
    pub page_number: Option<i32>,
    pub section_title: Option<String>,
    /// Original question text; AMA chunks only.
    pub question: Option<String>,
    pub context_header: Option<String>,
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn new(
        document_id: impl Into<String>,
        chunk_index: i64,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            chunk_index,
            token_count: estimate_text_tokens(&content),
            content,
            page_number: None,
            section_title: None,
            question: None,
            context_header: None,
            embedding,
        }
    }

    pub fn with_page(mut self, page: i32) -> Self {
        self.page_number = Some(page);
        self
    }

    pub fn with_section(mut self, title: impl Into<String>) -> Self {
        self.section_title = Some(title.into());
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }
}

/// A chunk returned for one query, with its score and denormalized document fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    pub id: String,
    pub content: String,
    /// Combined (hybrid) or pure-semantic score, depending on the search path.
    pub similarity: f64,
    pub document_id: String,
    pub document_title: String,
    pub source_type: SourceType,
    pub author: Option<String>,
    pub page_number: Option<i32>,
    pub section_title: Option<String>,
    pub question: Option<String>,
    pub url: Option<String>,
}

/// Ordered retrieval output plus an approximate token count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    pub total_tokens: usize,
}

impl RetrievalResult {
    /// The "no context" result: zero chunks, zero tokens.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap chunks in search order, estimating the token total.
    pub fn from_chunks(chunks: Vec<RetrievedChunk>) -> Self {
        let total_tokens = estimate_tokens(&chunks);
        Self {
            chunks,
            total_tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// `round(Σ word_count(content) × 1.3)` over the chunks.
pub fn estimate_tokens(chunks: &[RetrievedChunk]) -> usize {
    let total: f64 = chunks
        .iter()
        .map(|c| word_count(&c.content) as f64 * TOKENS_PER_WORD)
        .sum();
    total.round() as usize
}

fn estimate_text_tokens(text: &str) -> usize {
    (word_count(text) as f64 * TOKENS_PER_WORD).round() as usize
}

/// Hex SHA-256 of a document body.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
