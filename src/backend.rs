//! Builds the [`Retriever`] from configuration.
//!
//! | `backend.kind` | Backend |
//! |----------------|---------|
//! | `"rest"` | [`RestRpcBackend`] |
//! | `"postgres"` | [`PgBackend`] |

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;

use pmmsherpa_core::backend::SearchBackend;
use pmmsherpa_core::retrieval::Retriever;

use crate::config::{BackendConfig, Config};
use crate::embedding::OpenAIEmbedder;
use crate::pg_backend::PgBackend;
use crate::rest_backend::RestRpcBackend;

pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn SearchBackend>> {
    match config.kind.as_str() {
        "rest" => Ok(Arc::new(RestRpcBackend::from_config(config)?)),
        "postgres" => Ok(Arc::new(PgBackend::from_config(config)?)),
        other => bail!("Unknown backend kind: {}", other),
    }
}

/// One embedder and one backend, shared by every request for the process lifetime.
pub fn create_retriever(config: &Config) -> Result<Retriever> {
    let embedder = Arc::new(OpenAIEmbedder::from_config(&config.embedding)?);
    let backend = create_backend(&config.backend)?;

    info!(
        backend = backend.name(),
        model = %config.embedding.model,
        dims = config.embedding.dims,
        "retriever ready"
    );

    Ok(Retriever::new(embedder, backend)
        .with_hybrid_defaults(config.retrieval.hybrid_options())
        .with_semantic_defaults(config.retrieval.semantic_options()))
}
