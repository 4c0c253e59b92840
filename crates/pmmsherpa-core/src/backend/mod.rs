//! Search backend abstraction.
//!
//! The knowledge base lives behind two database procedures:
//!
//! | Procedure | Purpose |
//! |-----------|---------|
//! | `hybrid_search` | Blend vector similarity with lexical match into one score |
//! | `match_chunks` | Pure vector similarity, the manual fallback path |
//!
//! Each procedure has an explicit argument record and row record here, so
//! the RPC contract is checked by the compiler rather than by a runtime
//! cast. Backends own ranking: rows come back ordered by descending score.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::models::{RetrievedChunk, SourceType};

/// Procedure name of the hybrid search RPC.
pub const HYBRID_SEARCH: &str = "hybrid_search";

/// Procedure name of the pure-vector RPC.
pub const MATCH_CHUNKS: &str = "match_chunks";

/// Arguments of `hybrid_search`, serialized with the procedure's parameter names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridSearchParams {
    pub query_embedding: Vec<f32>,
    /// Raw, unexpanded query text for the lexical leg.
    pub search_query: String,
    pub semantic_weight: f64,
    pub match_threshold: f64,
    pub match_count: usize,
}

/// Arguments of `match_chunks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchChunksParams {
    pub query_embedding: Vec<f32>,
    pub match_threshold: f64,
    pub match_count: usize,
}

/// One row returned by `hybrid_search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchRow {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub combined_score: f64,
    #[serde(default)]
    pub token_count: Option<i64>,
    #[serde(default)]
    pub context_header: Option<String>,
    #[serde(default)]
    pub page_number: Option<i32>,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    pub document_title: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One row returned by `match_chunks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchChunksRow {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub similarity: f64,
    #[serde(default)]
    pub token_count: Option<i64>,
    #[serde(default)]
    pub context_header: Option<String>,
    #[serde(default)]
    pub page_number: Option<i32>,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    pub document_title: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<HybridSearchRow> for RetrievedChunk {
    fn from(row: HybridSearchRow) -> Self {
        RetrievedChunk {
            id: row.id,
            content: row.content,
            similarity: row.combined_score,
            document_id: row.document_id,
            document_title: row.document_title,
            source_type: row.source_type,
            author: row.author,
            page_number: row.page_number,
            section_title: row.section_title,
            question: row.question,
            url: row.url,
        }
    }
}

impl From<MatchChunksRow> for RetrievedChunk {
    fn from(row: MatchChunksRow) -> Self {
        RetrievedChunk {
            id: row.id,
            content: row.content,
            similarity: row.similarity,
            document_id: row.document_id,
            document_title: row.document_title,
            source_type: row.source_type,
            author: row.author,
            page_number: row.page_number,
            section_title: row.section_title,
            question: row.question,
            url: row.url,
        }
    }
}

/// A knowledge-base search backend exposing the two search procedures.
///
/// Implementations: `RestRpcBackend` and `PgBackend` in the app crate,
/// [`memory::InMemoryBackend`] here.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short backend identifier used in logs (e.g. `"rest"`, `"postgres"`).
    fn name(&self) -> &str;

    /// Run `hybrid_search`. Rows are ordered by descending `combined_score`.
    async fn hybrid_search(
        &self,
        params: &HybridSearchParams,
    ) -> Result<Vec<HybridSearchRow>, UpstreamError>;

    /// Run `match_chunks`. Rows are ordered by descending `similarity`.
    async fn match_chunks(
        &self,
        params: &MatchChunksParams,
    ) -> Result<Vec<MatchChunksRow>, UpstreamError>;
}
