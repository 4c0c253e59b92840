//! Search procedures called directly over a Postgres connection pool.
//!
//! The database must provide `hybrid_search` and `match_chunks` as
//! set-returning functions. The query embedding is bound as its pgvector
//! text form and cast with `$1::vector`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::debug;

use pmmsherpa_core::backend::{
    HybridSearchParams, HybridSearchRow, MatchChunksParams, MatchChunksRow, SearchBackend,
    HYBRID_SEARCH, MATCH_CHUNKS,
};
use pmmsherpa_core::embedding::to_pgvector_literal;
use pmmsherpa_core::error::UpstreamError;
use pmmsherpa_core::models::SourceType;

use crate::config::BackendConfig;

const ROW_COLUMNS: &str = "id::text AS id, document_id::text AS document_id, content, \
     token_count::int8 AS token_count, context_header, page_number::int4 AS page_number, \
     section_title, question, document_title, source_type::text AS source_type, author, url";

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily-connecting pool from `backend.database_url_env`.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let url = std::env::var(&config.database_url_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.database_url_env)
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect_lazy(&url)
            .with_context(|| "Invalid database URL")?;

        Ok(Self::from_pool(pool))
    }
}

/// `match_count` as the `int4` the procedures take.
fn match_count_arg(procedure: &str, count: usize) -> Result<i32, UpstreamError> {
    i32::try_from(count).map_err(|_| {
        UpstreamError::rpc(procedure, format!("match_count {} does not fit in int4", count))
    })
}

fn map_sqlx_err(procedure: &str, e: sqlx::Error) -> UpstreamError {
    match e {
        sqlx::Error::PoolTimedOut => UpstreamError::timeout(procedure),
        other => UpstreamError::rpc(procedure, other.to_string()),
    }
}

struct CommonFields {
    id: String,
    document_id: String,
    content: String,
    token_count: Option<i64>,
    context_header: Option<String>,
    page_number: Option<i32>,
    section_title: Option<String>,
    question: Option<String>,
    document_title: String,
    source_type: SourceType,
    author: Option<String>,
    url: Option<String>,
}

fn read_common(procedure: &str, row: &PgRow) -> Result<CommonFields, UpstreamError> {
    let invalid = |e: sqlx::Error| UpstreamError::invalid_response(procedure, e.to_string());

    let raw_type: String = row.try_get("source_type").map_err(invalid)?;
    let source_type = SourceType::parse(&raw_type).ok_or_else(|| {
        UpstreamError::invalid_response(procedure, format!("unknown source_type '{}'", raw_type))
    })?;
    let document_title: Option<String> = row.try_get("document_title").map_err(invalid)?;

    Ok(CommonFields {
        id: row.try_get("id").map_err(invalid)?,
        document_id: row.try_get("document_id").map_err(invalid)?,
        content: row.try_get("content").map_err(invalid)?,
        token_count: row.try_get("token_count").map_err(invalid)?,
        context_header: row.try_get("context_header").map_err(invalid)?,
        page_number: row.try_get("page_number").map_err(invalid)?,
        section_title: row.try_get("section_title").map_err(invalid)?,
        question: row.try_get("question").map_err(invalid)?,
        document_title: document_title.unwrap_or_default(),
        source_type,
        author: row.try_get("author").map_err(invalid)?,
        url: row.try_get("url").map_err(invalid)?,
    })
}

#[async_trait]
impl SearchBackend for PgBackend {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn hybrid_search(
        &self,
        params: &HybridSearchParams,
    ) -> Result<Vec<HybridSearchRow>, UpstreamError> {
        let sql = format!(
            "SELECT {}, combined_score::float8 AS score \
             FROM hybrid_search($1::vector, $2, $3, $4, $5)",
            ROW_COLUMNS
        );
        let match_count = match_count_arg(HYBRID_SEARCH, params.match_count)?;
        debug!(procedure = HYBRID_SEARCH, match_count, "sql call");

        let rows = sqlx::query(&sql)
            .bind(to_pgvector_literal(&params.query_embedding))
            .bind(&params.search_query)
            .bind(params.semantic_weight)
            .bind(params.match_threshold)
            .bind(match_count)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(HYBRID_SEARCH, e))?;

        rows.iter()
            .map(|row| {
                let f = read_common(HYBRID_SEARCH, row)?;
                let combined_score: f64 = row
                    .try_get("score")
                    .map_err(|e| UpstreamError::invalid_response(HYBRID_SEARCH, e.to_string()))?;
                Ok(HybridSearchRow {
                    id: f.id,
                    document_id: f.document_id,
                    content: f.content,
                    combined_score,
                    token_count: f.token_count,
                    context_header: f.context_header,
                    page_number: f.page_number,
                    section_title: f.section_title,
                    question: f.question,
                    document_title: f.document_title,
                    source_type: f.source_type,
                    author: f.author,
                    url: f.url,
                })
            })
            .collect()
    }

    async fn match_chunks(
        &self,
        params: &MatchChunksParams,
    ) -> Result<Vec<MatchChunksRow>, UpstreamError> {
        let sql = format!(
            "SELECT {}, similarity::float8 AS score \
             FROM match_chunks($1::vector, $2, $3)",
            ROW_COLUMNS
        );
        let match_count = match_count_arg(MATCH_CHUNKS, params.match_count)?;
        debug!(procedure = MATCH_CHUNKS, match_count, "sql call");

        let rows = sqlx::query(&sql)
            .bind(to_pgvector_literal(&params.query_embedding))
            .bind(params.match_threshold)
            .bind(match_count)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(MATCH_CHUNKS, e))?;

        rows.iter()
            .map(|row| {
                let f = read_common(MATCH_CHUNKS, row)?;
                let similarity: f64 = row
                    .try_get("score")
                    .map_err(|e| UpstreamError::invalid_response(MATCH_CHUNKS, e.to_string()))?;
                Ok(MatchChunksRow {
                    id: f.id,
                    document_id: f.document_id,
                    content: f.content,
                    similarity,
                    token_count: f.token_count,
                    context_header: f.context_header,
                    page_number: f.page_number,
                    section_title: f.section_title,
                    question: f.question,
                    document_title: f.document_title,
                    source_type: f.source_type,
                    author: f.author,
                    url: f.url,
                })
            })
            .collect()
    }
}
