//! # PMMSherpa
//!
//! Retrieval service for the PMMSherpa product marketing assistant.
//!
//! The retrieval logic lives in [`pmmsherpa_core`]. This crate wires it to
//! real upstreams and exposes it through a CLI and an HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ OpenAIEmbedder │──▶│  Retriever   │◀──│ RestRpcBackend /   │
//! │  /embeddings   │   │ (core crate) │   │ PgBackend          │
//! └────────────────┘   └──────┬───────┘   └────────────────────┘
//!                             │
//!                   ┌─────────┴─────────┐
//!                   ▼                   ▼
//!              ┌──────────┐       ┌──────────┐
//!              │   CLI    │       │   HTTP   │
//!              │ (sherpa) │       │  (axum)  │
//!              └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | OpenAI-compatible embedding client |
//! | [`rest_backend`] | Search procedures over HTTP RPC |
//! | [`pg_backend`] | Search procedures over a Postgres pool |
//! | [`backend`] | Retriever construction from config |
//! | [`search`] | CLI commands |
//! | [`server`] | HTTP server |
//! | [`logging`] | `tracing` subscriber setup |

pub mod backend;
pub mod config;
pub mod embedding;
pub mod logging;
pub mod pg_backend;
pub mod rest_backend;
pub mod search;
pub mod server;
