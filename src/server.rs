//! HTTP API over the retrieval pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/retrieve` | Hybrid retrieval: `{ chunks, totalTokens }` |
//! | `POST` | `/retrieve/semantic` | Pure-vector retrieval |
//! | `POST` | `/context` | Prompt-ready context plus citations |
//! | `POST` | `/expand` | Acronym expansion of a query |
//! | `POST` | `/prompt` | Full chat-turn preparation |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! The only error code is `bad_request` (400). Retrieval is fail-soft, so
//! upstream outages surface as empty results.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use pmmsherpa_core::chat::{prepare_turn, TurnError, TurnInput};
use pmmsherpa_core::citation::{extract_citations, Citation};
use pmmsherpa_core::context::format_context_for_prompt;
use pmmsherpa_core::expand::expand_query;
use pmmsherpa_core::models::RetrievalResult;
use pmmsherpa_core::prompt::ChatMessage;
use pmmsherpa_core::retrieval::{InvalidOverride, RetrievalRequest, Retriever, MAX_TOP_K};
use pmmsherpa_core::web_search::{should_auto_enable_web_search, WebSearchDecision};

use crate::backend::create_retriever;
use crate::config::Config;

#[derive(Clone)]
struct AppState {
    retriever: Arc<Retriever>,
}

/// Build the router around an existing retriever.
pub fn router(retriever: Retriever) -> Router {
    let state = AppState {
        retriever: Arc::new(retriever),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/retrieve", post(handle_retrieve))
        .route("/retrieve/semantic", post(handle_retrieve_semantic))
        .route("/context", post(handle_context))
        .route("/expand", post(handle_expand))
        .route("/prompt", post(handle_prompt))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let retriever = create_retriever(config)?;
    let app = router(retriever);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "PMMSherpa server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

pub(crate) struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        bad_request(e.body_text())
    }
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        bad_request(e.to_string())
    }
}

fn validate_request(req: &RetrievalRequest) -> Result<(), AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    req.check_overrides().map_err(|e| {
        bad_request(match e {
            InvalidOverride::TopK => format!("topK must be between 1 and {}", MAX_TOP_K),
            InvalidOverride::SemanticWeight => "semanticWeight must be in [0.0, 1.0]".to_string(),
            InvalidOverride::MatchThreshold => "matchThreshold must be in [0.0, 1.0]".to_string(),
        })
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /retrieve, /retrieve/semantic ============

async fn handle_retrieve(
    State(state): State<AppState>,
    body: Result<Json<RetrievalRequest>, JsonRejection>,
) -> Result<Json<RetrievalResult>, AppError> {
    let Json(req) = body?;
    validate_request(&req)?;
    Ok(Json(state.retriever.retrieve_context(&req).await))
}

async fn handle_retrieve_semantic(
    State(state): State<AppState>,
    body: Result<Json<RetrievalRequest>, JsonRejection>,
) -> Result<Json<RetrievalResult>, AppError> {
    let Json(req) = body?;
    validate_request(&req)?;
    let options = req.semantic_options(state.retriever.semantic_defaults());
    Ok(Json(state.retriever.semantic_search(&req.query, &options).await))
}

// ============ POST /context ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextResponse {
    context: String,
    citations: Vec<Citation>,
    total_tokens: usize,
}

async fn handle_context(
    State(state): State<AppState>,
    body: Result<Json<RetrievalRequest>, JsonRejection>,
) -> Result<Json<ContextResponse>, AppError> {
    let Json(req) = body?;
    validate_request(&req)?;
    let result = state.retriever.retrieve_context(&req).await;

    Ok(Json(ContextResponse {
        context: format_context_for_prompt(&result.chunks),
        citations: extract_citations(&result.chunks),
        total_tokens: result.total_tokens,
    }))
}

// ============ POST /expand ============

#[derive(Deserialize)]
struct ExpandRequest {
    query: String,
}

#[derive(Serialize)]
struct ExpandResponse {
    query: String,
    expanded: String,
}

async fn handle_expand(
    body: Result<Json<ExpandRequest>, JsonRejection>,
) -> Result<Json<ExpandResponse>, AppError> {
    let Json(req) = body?;
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let expanded = expand_query(&req.query);
    Ok(Json(ExpandResponse {
        query: req.query,
        expanded,
    }))
}

// ============ POST /prompt ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptResponse {
    system: String,
    messages: Vec<ChatMessage>,
    citations: Vec<Citation>,
    chunk_count: usize,
    total_tokens: usize,
    retrieval_ms: u64,
    web_search: WebSearchDecision,
}

async fn handle_prompt(
    State(state): State<AppState>,
    body: Result<Json<TurnInput>, JsonRejection>,
) -> Result<Json<PromptResponse>, AppError> {
    let Json(input) = body?;
    let web_search = should_auto_enable_web_search(&input.message);
    let turn = prepare_turn(&state.retriever, input).await?;

    Ok(Json(PromptResponse {
        system: turn.system,
        messages: turn.messages,
        citations: turn.citations,
        chunk_count: turn.chunk_count,
        total_tokens: turn.total_tokens,
        retrieval_ms: turn.retrieval_ms,
        web_search,
    }))
}
