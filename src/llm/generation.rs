use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use crate::auth::TokenProvider;
use crate::config::VertexConfig;
use crate::core::errors::RagError;

use super::types::GenerationOptions;

/// Client for the Vertex `generateContent` endpoint.
///
/// Same 401 policy as the embedding client: refresh once, retry once. A
/// malformed success body is a distinct failure (`GenerationParse`) from a
/// non-200 status (`GenerationService`).
pub struct GenerationClient {
    client: Client,
    config: VertexConfig,
    options: GenerationOptions,
    tokens: Arc<dyn TokenProvider>,
}

impl GenerationClient {
    pub fn new(client: Client, config: VertexConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            config,
            options: GenerationOptions::default(),
            tokens,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let token = self.tokens.token().await?;
        let mut res = self.call(prompt, &token).await?;

        if res.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("generation call returned 401, refreshing token");
            let token = self.tokens.refresh().await?;
            res = self.call(prompt, &token).await?;
        }

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::GenerationService {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| RagError::GenerationParse(err.to_string()))?;
        extract_answer(&payload)
    }

    async fn call(&self, prompt: &str, token: &str) -> Result<Response, RagError> {
        let url = self
            .config
            .model_url(&self.config.generation_model, "generateContent");
        let body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}],
                }
            ],
            "generationConfig": self.options,
        });

        self.client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RagError::Timeout("generation service".to_string())
                } else {
                    RagError::GenerationService {
                        status: 0,
                        body: err.to_string(),
                    }
                }
            })
    }
}

fn extract_answer(payload: &Value) -> Result<String, RagError> {
    payload["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|text| text.to_string())
        .ok_or_else(|| {
            RagError::GenerationParse(format!(
                "response missing candidates[0].content.parts[0].text: {}",
                payload
            ))
        })
}
