//! In-memory [`SearchBackend`] for tests and offline runs.
//!
//! Documents and chunks sit behind `std::sync::RwLock`. Both procedures
//! are brute force over every stored chunk, using the blend from
//! [`crate::search`]. Removing a document removes its chunks, so every
//! returned row references a document that still exists.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    HybridSearchParams, HybridSearchRow, MatchChunksParams, MatchChunksRow, SearchBackend,
};
use crate::embedding::cosine_similarity;
use crate::error::UpstreamError;
use crate::models::{Chunk, Document};
use crate::search::{blend_score, lexical_score, rank_order};

/// In-memory knowledge base.
pub struct InMemoryBackend {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Store a document and replace all of its chunks.
    ///
    /// Chunks whose `document_id` does not match `doc.id` are re-parented to it.
    pub fn insert_document(&self, doc: Document, chunks: Vec<Chunk>) {
        let doc_id = doc.id.clone();
        {
            let mut stored = self.chunks.write().unwrap_or_else(|e| e.into_inner());
            stored.retain(|c| c.document_id != doc_id);
            stored.extend(chunks.into_iter().map(|mut c| {
                c.document_id = doc_id.clone();
                c
            }));
        }
        self.docs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(doc_id, doc);
    }

    /// Remove a document and, by cascade, its chunks. Returns whether it existed.
    pub fn remove_document(&self, id: &str) -> bool {
        let existed = self
            .docs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some();
        self.chunks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|c| c.document_id != id);
        existed
    }

    pub fn document_count(&self) -> usize {
        self.docs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Score every chunk whose document exists, returning `(chunk, doc, score)`.
    fn score_all<F>(&self, score: F) -> Vec<(Chunk, Document, f64)>
    where
        F: Fn(&Chunk) -> f64,
    {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        let chunks = self.chunks.read().unwrap_or_else(|e| e.into_inner());

        chunks
            .iter()
            .filter_map(|c| {
                let doc = docs.get(&c.document_id)?;
                Some((c.clone(), doc.clone(), score(c)))
            })
            .collect()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn select(
    mut scored: Vec<(Chunk, Document, f64)>,
    threshold: f64,
    count: usize,
) -> Vec<(Chunk, Document, f64)> {
    scored.retain(|(_, _, s)| *s >= threshold);
    scored.sort_by(|a, b| rank_order(a.2, &a.0.id, b.2, &b.0.id));
    scored.truncate(count);
    scored
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn hybrid_search(
        &self,
        params: &HybridSearchParams,
    ) -> Result<Vec<HybridSearchRow>, UpstreamError> {
        let scored = self.score_all(|c| {
            let semantic = cosine_similarity(&params.query_embedding, &c.embedding).max(0.0) as f64;
            let lexical = lexical_score(&params.search_query, &c.content);
            blend_score(semantic, lexical, params.semantic_weight)
        });

        Ok(select(scored, params.match_threshold, params.match_count)
            .into_iter()
            .map(|(c, doc, score)| HybridSearchRow {
                id: c.id,
                document_id: c.document_id,
                content: c.content,
                combined_score: score,
                token_count: Some(c.token_count as i64),
                context_header: c.context_header,
                page_number: c.page_number,
                section_title: c.section_title,
                question: c.question,
                document_title: doc.title,
                source_type: doc.source_type,
                author: doc.author,
                url: doc.url,
            })
            .collect())
    }

    async fn match_chunks(
        &self,
        params: &MatchChunksParams,
    ) -> Result<Vec<MatchChunksRow>, UpstreamError> {
        let scored =
            self.score_all(|c| cosine_similarity(&params.query_embedding, &c.embedding) as f64);

        Ok(select(scored, params.match_threshold, params.match_count)
            .into_iter()
            .map(|(c, doc, score)| MatchChunksRow {
                id: c.id,
                document_id: c.document_id,
                content: c.content,
                similarity: score,
                token_count: Some(c.token_count as i64),
                context_header: c.context_header,
                page_number: c.page_number,
                section_title: c.section_title,
                question: c.question,
                document_title: doc.title,
                source_type: doc.source_type,
                author: doc.author,
                url: doc.url,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    fn seeded() -> (InMemoryBackend, String) {
        let backend = InMemoryBackend::new();
        let book = Document::new("Obviously Awesome", SourceType::Book, "positioning")
            .with_author("April Dunford");
        let book_id = book.id.clone();
        let positioning = "Positioning defines how your product is the best";
        let alternatives = "Competitive alternatives are what customers would do";
        backend.insert_document(
            book,
            vec![
                Chunk::new("", 0, positioning, vec![1.0, 0.0]).with_page(12),
                Chunk::new("", 1, alternatives, vec![0.6, 0.8]).with_page(40),
            ],
        );
        let ama = Document::new("Launching at scale", SourceType::Ama, "launches");
        let tiering = Chunk::new("", 0, "Tier one launches need a launch plan", vec![0.0, 1.0])
            .with_question("How do you tier launches?");
        backend.insert_document(ama, vec![tiering]);
        (backend, book_id)
    }

    fn hybrid(
        query: &str,
        embedding: Vec<f32>,
        threshold: f64,
        count: usize,
    ) -> HybridSearchParams {
        HybridSearchParams {
            query_embedding: embedding,
            search_query: query.to_string(),
            semantic_weight: 0.7,
            match_threshold: threshold,
            match_count: count,
        }
    }

    #[tokio::test]
    async fn test_hybrid_orders_by_descending_score() {
        let (backend, _) = seeded();
        let rows = backend
            .hybrid_search(&hybrid("positioning product", vec![1.0, 0.0], 0.0, 10))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        for pair in rows.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
        assert_eq!(rows[0].page_number, Some(12));
        assert_eq!(rows[0].document_title, "Obviously Awesome");
    }

    #[tokio::test]
    async fn test_hybrid_respects_threshold_and_count() {
        let (backend, _) = seeded();
        let rows = backend
            .hybrid_search(&hybrid("launch", vec![0.0, 1.0], 0.5, 10))
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.combined_score >= 0.5));

        let capped = backend
            .hybrid_search(&hybrid("launch", vec![0.0, 1.0], 0.0, 1))
            .await
            .unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(
            capped[0].question.as_deref(),
            Some("How do you tier launches?")
        );
    }

    #[tokio::test]
    async fn test_lexical_leg_contributes() {
        let (backend, _) = seeded();
        // Orthogonal to every embedding on the semantic leg except via lexical match.
        let rows = backend
            .hybrid_search(&hybrid("competitive alternatives", vec![-1.0, 0.0], 0.0, 10))
            .await
            .unwrap();
        assert!(rows[0].content.starts_with("Competitive alternatives"));
        assert!((rows[0].combined_score - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_match_chunks_pure_vector() {
        let (backend, _) = seeded();
        let rows = backend
            .match_chunks(&MatchChunksParams {
                query_embedding: vec![0.0, 1.0],
                match_threshold: 0.5,
                match_count: 8,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[0].similarity - 1.0).abs() < 1e-6);
        assert!((rows[1].similarity - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_remove_document_cascades_chunks() {
        let (backend, book_id) = seeded();
        assert_eq!(backend.chunk_count(), 3);
        assert!(backend.remove_document(&book_id));
        assert_eq!(backend.chunk_count(), 1);
        assert_eq!(backend.document_count(), 1);
        assert!(!backend.remove_document(&book_id));

        let rows = backend
            .hybrid_search(&hybrid("positioning", vec![1.0, 0.0], 0.0, 10))
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.document_title != "Obviously Awesome"));
    }
}
