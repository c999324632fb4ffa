use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use crate::auth::TokenProvider;
use crate::config::VertexConfig;
use crate::core::errors::RagError;

use super::types::EMBEDDING_DIM;

/// Client for the Vertex text-embedding endpoint.
///
/// Policy on auth failure: a single 401 triggers one token refresh and one
/// retried call; a second 401 (or any other non-200) is terminal. No backoff.
pub struct EmbeddingClient {
    client: Client,
    config: VertexConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl EmbeddingClient {
    pub fn new(client: Client, config: VertexConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            config,
            tokens,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let token = self.tokens.token().await?;
        let mut res = self.call(text, &token).await?;

        if res.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("embedding call returned 401, refreshing token");
            let token = self.tokens.refresh().await?;
            res = self.call(text, &token).await?;
        }

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingService {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = res.json().await.map_err(|err| RagError::EmbeddingService {
            status: status.as_u16(),
            body: err.to_string(),
        })?;
        parse_embedding(&payload)
    }

    async fn call(&self, text: &str, token: &str) -> Result<Response, RagError> {
        let url = self
            .config
            .model_url(&self.config.embedding_model, "predict");
        let body = json!({
            "instances": [
                {
                    "content": text,
                    "task_type": "RETRIEVAL_DOCUMENT",
                }
            ]
        });

        self.client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RagError::Timeout("embedding service".to_string())
                } else {
                    // No HTTP response at all; status 0 marks transport failure.
                    RagError::EmbeddingService {
                        status: 0,
                        body: err.to_string(),
                    }
                }
            })
    }
}

fn parse_embedding(payload: &Value) -> Result<Vec<f32>, RagError> {
    let values = payload["predictions"][0]["embeddings"]["values"]
        .as_array()
        .ok_or_else(|| RagError::EmbeddingService {
            status: 200,
            body: "response missing predictions[0].embeddings.values".to_string(),
        })?;

    let vector: Vec<f32> = values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();

    if vector.len() != EMBEDDING_DIM {
        return Err(RagError::EmbeddingService {
            status: 200,
            body: format!(
                "expected {} embedding values, got {}",
                EMBEDDING_DIM,
                vector.len()
            ),
        });
    }

    Ok(vector)
}
