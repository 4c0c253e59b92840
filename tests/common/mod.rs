//! Local stand-ins for the embedding API and the RPC endpoint.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

#[derive(Default)]
pub struct Recorded {
    pub embedding_bodies: Mutex<Vec<Value>>,
    pub rpc_bodies: Mutex<Vec<(String, Value)>>,
    pub api_keys: Mutex<Vec<String>>,
}

pub struct StubUpstream {
    pub base_url: String,
    pub recorded: Arc<Recorded>,
}

impl StubUpstream {
    pub fn embeddings_url(&self) -> String {
        format!("{}/v1", self.base_url)
    }

    pub fn slow_embeddings_url(&self) -> String {
        format!("{}/slow/v1", self.base_url)
    }
}

/// Rows the stub returns from `hybrid_search`.
pub fn hybrid_rows() -> Value {
    json!([
        {
            "id": "chunk-1",
            "document_id": "doc-1",
            "content": "Start with your best-fit customers and work backwards.",
            "combined_score": 0.91,
            "token_count": 9,
            "context_header": null,
            "page_number": 34,
            "section_title": "Positioning",
            "question": null,
            "document_title": "Obviously Awesome",
            "source_type": "book",
            "author": "April Dunford",
            "url": null
        },
        {
            "id": "chunk-2",
            "document_id": "doc-2",
            "content": "Interview five recent buyers before writing the ICP.",
            "combined_score": 0.58,
            "token_count": 8,
            "context_header": null,
            "page_number": null,
            "section_title": null,
            "question": "How do you define an ICP?",
            "document_title": "ICP AMA",
            "source_type": "ama",
            "author": "Jane Doe",
            "url": "https://sharebird.com/ama/icp"
        }
    ])
}

pub fn match_rows() -> Value {
    json!([
        {
            "id": "chunk-3",
            "document_id": "doc-3",
            "content": "Tier launches by customer impact.",
            "similarity": 0.77,
            "document_title": "Launch Tiers",
            "source_type": "blog",
            "author": null,
            "url": "https://productmarketingalliance.com/launch-tiers"
        }
    ])
}

async fn embeddings(State(rec): State<Arc<Recorded>>, Json(body): Json<Value>) -> Json<Value> {
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    rec.embedding_bodies.lock().unwrap().push(body);

    // Reverse order so clients must sort by index.
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, _)| {
            json!({ "object": "embedding", "index": i, "embedding": [1.0, i as f32, 0.0] })
        })
        .collect();

    Json(json!({ "object": "list", "data": data, "model": "text-embedding-3-small" }))
}

async fn slow_embeddings(Json(_body): Json<Value>) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "data": [] }))
}

async fn hybrid_search(
    State(rec): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record_rpc(&rec, &headers, "hybrid_search", &body);
    if body["search_query"] == "explode" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "function hybrid_search does not exist" })),
        );
    }
    (StatusCode::OK, Json(hybrid_rows()))
}

async fn match_chunks(
    State(rec): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record_rpc(&rec, &headers, "match_chunks", &body);
    Json(match_rows())
}

fn record_rpc(rec: &Recorded, headers: &HeaderMap, name: &str, body: &Value) {
    if let Some(key) = headers.get("apikey").and_then(|v| v.to_str().ok()) {
        rec.api_keys.lock().unwrap().push(key.to_string());
    }
    rec.rpc_bodies
        .lock()
        .unwrap()
        .push((name.to_string(), body.clone()));
}

/// Serve the stub on an ephemeral local port.
pub async fn spawn_stub_upstream() -> StubUpstream {
    let recorded = Arc::new(Recorded::default());

    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/slow/v1/embeddings", post(slow_embeddings))
        .route("/rest/v1/rpc/hybrid_search", post(hybrid_search))
        .route("/rest/v1/rpc/match_chunks", post(match_chunks))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubUpstream {
        base_url: format!("http://{}", addr),
        recorded,
    }
}
