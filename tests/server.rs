//! HTTP API tests: the router served on a local port over an in-memory knowledge base.

use std::sync::Arc;

use async_trait::async_trait;
use pmmsherpa::server::router;
use pmmsherpa_core::backend::memory::InMemoryBackend;
use pmmsherpa_core::embedding::Embedder;
use pmmsherpa_core::error::UpstreamError;
use pmmsherpa_core::models::{Chunk, Document, SourceType};
use pmmsherpa_core::retrieval::Retriever;
use serde_json::{json, Value};

/// Maps every text to the same unit vector.
struct UnitEmbedder;

#[async_trait]
impl Embedder for UnitEmbedder {
    fn model_name(&self) -> &str {
        "unit"
    }

    fn dims(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, UpstreamError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Fails every call, like an unreachable embedding API.
struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn model_name(&self) -> &str {
        "down"
    }

    fn dims(&self) -> usize {
        2
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, UpstreamError> {
        Err(UpstreamError::timeout("embeddings"))
    }
}

fn knowledge_base() -> InMemoryBackend {
    let kb = InMemoryBackend::new();

    let book = Document::new("Obviously Awesome", SourceType::Book, "positioning")
        .with_author("April Dunford");
    let text = "Positioning starts from competitive alternatives";
    let book_chunk = Chunk::new(book.id.clone(), 0, text, vec![1.0, 0.0]).with_page(21);
    kb.insert_document(book, vec![book_chunk]);

    let ama = Document::new("Launch AMA", SourceType::Ama, "launches").with_author("Sam Lee");
    let ama_chunks = vec![
        Chunk::new(ama.id.clone(), 0, "Tier every launch by customer impact", vec![0.0, 1.0])
            .with_question("How do you tier launches?"),
    ];
    kb.insert_document(ama, ama_chunks);

    kb
}

async fn spawn_app() -> String {
    let retriever = Retriever::new(Arc::new(UnitEmbedder), Arc::new(knowledge_base()));
    serve(retriever).await
}

async fn serve(retriever: Retriever) -> String {
    let app = router(retriever);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let resp = client()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health_reports_version() {
    let base = spawn_app().await;
    let body: Value = client()
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_retrieve_returns_camel_case_result() {
    let base = spawn_app().await;
    let request = json!({ "query": "positioning alternatives" });
    let (status, body) = post(&base, "/retrieve", request).await;

    assert_eq!(status, 200);
    let chunks = body["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0]["documentTitle"], "Obviously Awesome");
    assert_eq!(chunks[0]["pageNumber"], 21);
    // round(5 words * 1.3)
    assert_eq!(body["totalTokens"], 7);
}

#[tokio::test]
async fn test_retrieve_validation_errors() {
    let base = spawn_app().await;

    let (status, body) = post(&base, "/retrieve", json!({ "query": "   " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = post(&base, "/retrieve", json!({ "query": "gtm", "topK": 51 })).await;
    assert_eq!(status, 400);

    let request = json!({ "query": "gtm", "semanticWeight": 1.5 });
    let (status, body) = post(&base, "/retrieve", request).await;
    assert_eq!(status, 400);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("semanticWeight"));

    let (status, body) = post(&base, "/retrieve", json!({ "topK": 3 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_semantic_endpoint_uses_vector_threshold() {
    let base = spawn_app().await;
    let request = json!({ "query": "launch tiers" });
    let (status, body) = post(&base, "/retrieve/semantic", request).await;
    assert_eq!(status, 200);
    let chunks = body["chunks"].as_array().unwrap();
    // Only the chunk aligned with the query vector clears 0.5.
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0]["sourceType"], "book");
    assert_eq!(chunks[0]["similarity"], 1.0);
}

#[tokio::test]
async fn test_context_endpoint() {
    let base = spawn_app().await;
    let (status, body) = post(&base, "/context", json!({ "query": "positioning" })).await;
    assert_eq!(status, 200);
    let context = body["context"].as_str().unwrap();
    let header = "[Source 1] \"Obviously Awesome\" by April Dunford (Page 21)\n";
    assert!(context.starts_with(header));
    assert_eq!(body["citations"][0]["source"], "Obviously Awesome");
    assert_eq!(body["citations"][0]["page_number"], 21);
}

#[tokio::test]
async fn test_context_endpoint_sentinel_when_nothing_matches() {
    let base = spawn_app().await;
    let (status, body) = post(
        &base,
        "/context",
        json!({ "query": "pricing", "semanticWeight": 0.0, "matchThreshold": 0.9 }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        body["context"],
        "No relevant knowledge base content found for this query."
    );
    assert_eq!(body["citations"].as_array().unwrap().len(), 0);
    assert_eq!(body["totalTokens"], 0);
}

#[tokio::test]
async fn test_expand_endpoint() {
    let base = spawn_app().await;
    let (status, body) = post(&base, "/expand", json!({ "query": "GTM for PLG" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["query"], "GTM for PLG");
    assert_eq!(body["expanded"], "gtm for plg go to market product led growth");
}

#[tokio::test]
async fn test_prompt_endpoint() {
    let base = spawn_app().await;
    let (status, body) = post(
        &base,
        "/prompt",
        json!({
            "message": "Help me with positioning",
            "model": "gemini-2.5-thinking",
            "history": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ]
        }),
    )
    .await;

    assert_eq!(status, 200);
    let system = body["system"].as_str().unwrap();
    let note = "Gemini 2.5 Pro (Thinking) with extended thinking";
    assert!(system.contains(note));
    assert!(system.contains("[Source 1] \"Obviously Awesome\""));
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    assert_eq!(body["messages"][2]["content"], "Help me with positioning");
    assert_eq!(body["chunkCount"], 1);
    assert_eq!(body["webSearch"]["shouldEnable"], false);
}

#[tokio::test]
async fn test_prompt_rejects_empty_turn_and_unknown_model() {
    let base = spawn_app().await;

    let (status, body) = post(&base, "/prompt", json!({ "message": "", "model": "gpt-5.2" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = post(&base, "/prompt", json!({ "message": "hi", "model": "gpt-2" })).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_upstream_outage_returns_empty_result() {
    let retriever = Retriever::new(Arc::new(DownEmbedder), Arc::new(knowledge_base()));
    let base = serve(retriever).await;

    let (status, body) = post(&base, "/retrieve", json!({ "query": "positioning" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["chunks"].as_array().unwrap().len(), 0);
    assert_eq!(body["totalTokens"], 0);

    let (status, body) = post(&base, "/context", json!({ "query": "positioning" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["citations"].as_array().unwrap().len(), 0);
}
