//! Retrieval entry points.
//!
//! [`Retriever`] bundles an [`Embedder`] and a [`SearchBackend`] built once
//! at startup and shared across requests. It exposes two independent
//! paths; neither falls back to the other.
//!
//! | Path | Procedure | Default threshold |
//! |------|-----------|-------------------|
//! | [`Retriever::retrieve_context`] | `hybrid_search` | 0.4 |
//! | [`Retriever::semantic_search`] | `match_chunks` | 0.5 |
//!
//! Both come in a fallible `try_` form returning [`UpstreamError`] and a
//! fail-soft form that logs the error and returns
//! [`RetrievalResult::empty`], so a broken retrieval path degrades a chat
//! turn to "no context" instead of failing it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::{
    HybridSearchParams, MatchChunksParams, SearchBackend, HYBRID_SEARCH, MATCH_CHUNKS,
};
use crate::embedding::Embedder;
use crate::error::UpstreamError;
use crate::expand::expand_query;
use crate::models::{RetrievalResult, RetrievedChunk};

pub const DEFAULT_TOP_K: usize = 8;
pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.7;
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.4;
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.5;

/// Largest `top_k` a caller may request.
pub const MAX_TOP_K: usize = 50;

/// An explicit request field outside its accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidOverride {
    /// `top_k` outside `1..=MAX_TOP_K`.
    TopK,
    /// `semantic_weight` outside `[0, 1]`.
    SemanticWeight,
    /// `match_threshold` outside `[0, 1]`.
    MatchThreshold,
}

/// Tuning for the hybrid path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalOptions {
    /// Maximum chunks returned.
    pub top_k: usize,
    /// Share of the vector score in the blend; the rest is lexical.
    pub semantic_weight: f64,
    /// Minimum combined score.
    pub match_threshold: f64,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Tuning for the pure-vector path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticOptions {
    pub top_k: usize,
    pub match_threshold: f64,
}

impl Default for SemanticOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            match_threshold: DEFAULT_SEMANTIC_THRESHOLD,
        }
    }
}

/// Caller-facing request shape: `{ query, topK?, semanticWeight?, matchThreshold? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub semantic_weight: Option<f64>,
    #[serde(default)]
    pub match_threshold: Option<f64>,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Reject explicit fields outside their ranges. Absent fields always pass.
    pub fn check_overrides(&self) -> Result<(), InvalidOverride> {
        if let Some(k) = self.top_k {
            if !(1..=MAX_TOP_K).contains(&k) {
                return Err(InvalidOverride::TopK);
            }
        }
        let unit = 0.0..=1.0;
        if self.semantic_weight.is_some_and(|w| !unit.contains(&w)) {
            return Err(InvalidOverride::SemanticWeight);
        }
        if self.match_threshold.is_some_and(|t| !unit.contains(&t)) {
            return Err(InvalidOverride::MatchThreshold);
        }
        Ok(())
    }

    /// Hybrid options: explicit fields win over `defaults`.
    pub fn hybrid_options(&self, defaults: &RetrievalOptions) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.top_k.unwrap_or(defaults.top_k),
            semantic_weight: self.semantic_weight.unwrap_or(defaults.semantic_weight),
            match_threshold: self.match_threshold.unwrap_or(defaults.match_threshold),
        }
    }

    /// Semantic options: explicit fields win over `defaults`. `semanticWeight` is ignored.
    pub fn semantic_options(&self, defaults: &SemanticOptions) -> SemanticOptions {
        SemanticOptions {
            top_k: self.top_k.unwrap_or(defaults.top_k),
            match_threshold: self.match_threshold.unwrap_or(defaults.match_threshold),
        }
    }
}

/// Explicit retrieval client: one embedder, one search backend, default tuning.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn SearchBackend>,
    hybrid_defaults: RetrievalOptions,
    semantic_defaults: SemanticOptions,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            embedder,
            backend,
            hybrid_defaults: RetrievalOptions::default(),
            semantic_defaults: SemanticOptions::default(),
        }
    }

    pub fn with_hybrid_defaults(mut self, options: RetrievalOptions) -> Self {
        self.hybrid_defaults = options;
        self
    }

    pub fn with_semantic_defaults(mut self, options: SemanticOptions) -> Self {
        self.semantic_defaults = options;
        self
    }

    pub fn hybrid_defaults(&self) -> &RetrievalOptions {
        &self.hybrid_defaults
    }

    pub fn semantic_defaults(&self) -> &SemanticOptions {
        &self.semantic_defaults
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Hybrid retrieval for a caller request. Never fails; see [`Self::try_retrieve`].
    pub async fn retrieve_context(&self, request: &RetrievalRequest) -> RetrievalResult {
        let options = request.hybrid_options(&self.hybrid_defaults);
        match self.try_retrieve(&request.query, &options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    error = %e,
                    backend = self.backend.name(),
                    "hybrid search failed, continuing without context"
                );
                RetrievalResult::empty()
            }
        }
    }

    /// Expand, embed, run `hybrid_search`, map rows in the order returned.
    pub async fn try_retrieve(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<RetrievalResult, UpstreamError> {
        if query.trim().is_empty() {
            return Ok(RetrievalResult::empty());
        }

        let expanded = expand_query(query);
        let query_embedding = self.embedder.embed(&expanded).await?;

        let params = HybridSearchParams {
            query_embedding,
            search_query: query.to_string(),
            semantic_weight: options.semantic_weight,
            match_threshold: options.match_threshold,
            match_count: options.top_k,
        };

        debug!(
            procedure = HYBRID_SEARCH,
            backend = self.backend.name(),
            top_k = options.top_k,
            semantic_weight = options.semantic_weight,
            threshold = options.match_threshold,
            "calling search procedure"
        );
        let rows = self.backend.hybrid_search(&params).await?;
        let chunks: Vec<RetrievedChunk> = rows.into_iter().map(RetrievedChunk::from).collect();

        Ok(RetrievalResult::from_chunks(chunks))
    }

    /// Pure-vector retrieval. Never fails; see [`Self::try_semantic_search`].
    pub async fn semantic_search(
        &self,
        query: &str,
        options: &SemanticOptions,
    ) -> RetrievalResult {
        match self.try_semantic_search(query, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    error = %e,
                    backend = self.backend.name(),
                    "semantic search failed, continuing without context"
                );
                RetrievalResult::empty()
            }
        }
    }

    /// Expand, embed, run `match_chunks`, map rows in the order returned.
    pub async fn try_semantic_search(
        &self,
        query: &str,
        options: &SemanticOptions,
    ) -> Result<RetrievalResult, UpstreamError> {
        if query.trim().is_empty() {
            return Ok(RetrievalResult::empty());
        }

        let query_embedding = self.embedder.embed(&expand_query(query)).await?;
        let params = MatchChunksParams {
            query_embedding,
            match_threshold: options.match_threshold,
            match_count: options.top_k,
        };

        debug!(
            procedure = MATCH_CHUNKS,
            backend = self.backend.name(),
            top_k = options.top_k,
            threshold = options.match_threshold,
            "calling search procedure"
        );
        let rows = self.backend.match_chunks(&params).await?;
        let chunks: Vec<RetrievedChunk> = rows.into_iter().map(RetrievedChunk::from).collect();

        Ok(RetrievalResult::from_chunks(chunks))
    }
}
