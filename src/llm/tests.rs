use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::auth::TokenProvider;
use crate::config::{CredentialSource, VertexConfig};
use crate::core::errors::RagError;
use crate::llm::{EmbeddingClient, GenerationClient, EMBEDDING_DIM};

struct StaticTokenProvider {
    refreshes: AtomicUsize,
}

impl StaticTokenProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            refreshes: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, RagError> {
        Ok("token-0".to_string())
    }

    async fn refresh(&self) -> Result<String, RagError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok("token-1".to_string())
    }
}

struct StubState {
    hits: AtomicUsize,
    fail_first: usize,
    success_body: Value,
}

async fn stub_handler(State(state): State<Arc<StubState>>) -> axum::response::Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);
    if hit < state.fail_first {
        (StatusCode::UNAUTHORIZED, "token expired").into_response()
    } else {
        Json(state.success_body.clone()).into_response()
    }
}

/// Serve `success_body` after rejecting the first `fail_first` calls with 401.
async fn spawn_stub(fail_first: usize, success_body: Value) -> (String, Arc<StubState>) {
    let state = Arc::new(StubState {
        hits: AtomicUsize::new(0),
        fail_first,
        success_body,
    });
    let app = Router::new()
        .fallback(stub_handler)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}", addr), state)
}

fn vertex_config(endpoint: String) -> VertexConfig {
    VertexConfig {
        project_id: "test-project".to_string(),
        location: "us-central1".to_string(),
        endpoint,
        embedding_model: "gemini-embedding-001".to_string(),
        generation_model: "gemini-2.0-flash-001".to_string(),
        credentials: CredentialSource::Workload,
    }
}

fn embedding_body() -> Value {
    let values: Vec<f64> = (0..EMBEDDING_DIM).map(|i| i as f64 / 1000.0).collect();
    json!({"predictions": [{"embeddings": {"values": values}}]})
}

fn generation_body(text: &str) -> Value {
    json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
}

#[tokio::test]
async fn embed_retries_once_after_401() {
    let (endpoint, stub) = spawn_stub(1, embedding_body()).await;
    let tokens = StaticTokenProvider::new();
    let client = EmbeddingClient::new(
        reqwest::Client::new(),
        vertex_config(endpoint),
        tokens.clone(),
    );

    let vector = client.embed("What is RAG?").await.unwrap();
    assert_eq!(vector.len(), EMBEDDING_DIM);
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn embed_gives_up_after_second_401() {
    let (endpoint, stub) = spawn_stub(2, embedding_body()).await;
    let tokens = StaticTokenProvider::new();
    let client = EmbeddingClient::new(
        reqwest::Client::new(),
        vertex_config(endpoint),
        tokens.clone(),
    );

    let err = client.embed("What is RAG?").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingService { status: 401, .. }));
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn embed_flags_malformed_success_body_without_refresh() {
    let (endpoint, stub) = spawn_stub(0, json!({"predictions": []})).await;
    let tokens = StaticTokenProvider::new();
    let client = EmbeddingClient::new(
        reqwest::Client::new(),
        vertex_config(endpoint),
        tokens.clone(),
    );

    let err = client.embed("question").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingService { .. }));
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 0);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generate_retries_once_after_401() {
    let (endpoint, stub) = spawn_stub(1, generation_body("an answer")).await;
    let tokens = StaticTokenProvider::new();
    let client = GenerationClient::new(
        reqwest::Client::new(),
        vertex_config(endpoint),
        tokens.clone(),
    );

    let answer = client.generate("a prompt").await.unwrap();
    assert_eq!(answer, "an answer");
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn generate_gives_up_after_second_401() {
    let (endpoint, _stub) = spawn_stub(2, generation_body("an answer")).await;
    let tokens = StaticTokenProvider::new();
    let client = GenerationClient::new(
        reqwest::Client::new(),
        vertex_config(endpoint),
        tokens.clone(),
    );

    let err = client.generate("a prompt").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationService { status: 401, .. }));
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generate_flags_malformed_success_body() {
    let (endpoint, _stub) = spawn_stub(0, json!({"candidates": [{}]})).await;
    let tokens = StaticTokenProvider::new();
    let client = GenerationClient::new(reqwest::Client::new(), vertex_config(endpoint), tokens);

    let err = client.generate("a prompt").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationParse(_)));
}
