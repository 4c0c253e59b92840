//! # PMMSherpa Core
//!
//! I/O-free retrieval logic for PMMSherpa: data models, query expansion,
//! the embedding and search-backend seams, the fail-soft retriever,
//! context formatting, citations, prompt assembly and web-search detection.
//!
//! This crate contains no tokio, sqlx, reqwest, or filesystem access.
//! Concrete embedding clients and database backends live in the
//! `pmmsherpa` application crate; [`backend::memory::InMemoryBackend`] is
//! provided here for tests and offline use.
//!
//! ## Pipeline
//!
//! ```text
//! query ─▶ expand ─▶ embed ─▶ hybrid_search ─▶ RetrievedChunk[]
//!                                                  │
//!                              ┌───────────────────┤
//!                              ▼                   ▼
//!                     format_context        extract_citations
//!                              │                   │
//!                              ▼                   ▼
//!                        system prompt      assistant message
//! ```

pub mod backend;
pub mod chat;
pub mod citation;
pub mod context;
pub mod embedding;
pub mod error;
pub mod expand;
pub mod models;
pub mod prompt;
pub mod retrieval;
pub mod search;
pub mod web_search;
