//! Hybrid scoring helpers.
//!
//! The production ranking runs inside the database (`hybrid_search`). These
//! helpers reproduce the same blend locally for [`InMemoryBackend`]:
//!
//! 1. Semantic score: cosine similarity of query and chunk embeddings.
//! 2. Lexical score: fraction of distinct query terms present in the chunk.
//! 3. Blend: `score = w × semantic + (1 - w) × lexical`.
//! 4. Keep rows with `score >= threshold`, sort by score (desc), id (asc).
//! 5. Truncate to the match count.
//!
//! [`InMemoryBackend`]: crate::backend::memory::InMemoryBackend

use std::cmp::Ordering;
use std::collections::HashSet;

/// Lower-cased alphanumeric terms of `text`; single characters are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fraction of distinct query terms that occur in `content`, in `[0.0, 1.0]`.
///
/// Returns `0.0` when the query has no usable terms.
pub fn lexical_score(query: &str, content: &str) -> f64 {
    let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
    if query_terms.is_empty() {
        return 0.0;
    }

    let content_terms: HashSet<String> = tokenize(content).into_iter().collect();
    let hits = query_terms
        .iter()
        .filter(|t| content_terms.contains(*t))
        .count();

    hits as f64 / query_terms.len() as f64
}

/// Weighted blend of a semantic and a lexical score.
///
/// `semantic_weight` is clamped to `[0.0, 1.0]`; `1.0` is pure vector
/// ranking and `0.0` is pure lexical ranking.
pub fn blend_score(semantic: f64, lexical: f64, semantic_weight: f64) -> f64 {
    let w = semantic_weight.clamp(0.0, 1.0);
    w * semantic + (1.0 - w) * lexical
}

/// Descending score, then ascending id, for deterministic ordering.
pub fn rank_order(a_score: f64, a_id: &str, b_score: f64, b_id: &str) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_id.cmp(b_id))
}
