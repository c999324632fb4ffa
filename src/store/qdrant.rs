//! Qdrant REST gateway.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::QdrantConfig;
use crate::core::errors::RagError;

use super::{Distance, FieldFilter, Point, ScoredPoint, VectorStore};

pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantStore {
    pub fn new(client: Client, config: QdrantConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, RagError> {
        let res = builder
            .send()
            .await
            .map_err(|err| RagError::transport("qdrant", err))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::Store(format!("qdrant {}: {}", status, body)));
        }

        res.json().await.map_err(RagError::store)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f32,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
}

#[derive(Debug, Deserialize)]
struct ScrollPoint {
    id: Value,
    #[serde(default)]
    payload: Value,
}

fn filter_body(filters: &[FieldFilter]) -> Value {
    let must: Vec<Value> = filters
        .iter()
        .map(|f| json!({"key": f.key, "match": {"value": f.value}}))
        .collect();
    json!({"must": must})
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<(), RagError> {
        let path = format!("/collections/{}", name);
        let res = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|err| RagError::transport("qdrant", err))?;

        match res.status() {
            status if status.is_success() => {
                // Existing collection; leave its data alone.
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            status => {
                let body = res.text().await.unwrap_or_default();
                return Err(RagError::Store(format!("qdrant {}: {}", status, body)));
            }
        }

        tracing::info!("creating collection '{}' ({} dims)", name, vector_size);
        let body = json!({
            "vectors": {"size": vector_size, "distance": distance.as_str()}
        });
        self.send(self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn create_payload_index(&self, collection: &str, field: &str) -> Result<(), RagError> {
        let path = format!("/collections/{}/index?wait=true", collection);
        let body = json!({"field_name": field, "field_schema": "keyword"});
        self.send(self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, RagError> {
        let path = format!("/collections/{}/points/search", collection);
        let body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });

        let value = self
            .send(self.request(Method::POST, &path).json(&body))
            .await?;
        let response: SearchResponse = serde_json::from_value(value).map_err(RagError::store)?;

        Ok(response
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                payload: hit.payload,
                score: hit.score,
            })
            .collect())
    }

    async fn upsert(&self, collection: &str, point: Point) -> Result<(), RagError> {
        let path = format!("/collections/{}/points?wait=true", collection);
        let body = json!({
            "points": [
                {"id": point.id, "vector": point.vector, "payload": point.payload}
            ]
        });
        self.send(self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        limit: usize,
    ) -> Result<Vec<Point>, RagError> {
        let path = format!("/collections/{}/points/scroll", collection);
        let body = json!({
            "filter": filter_body(filters),
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });

        let value = self
            .send(self.request(Method::POST, &path).json(&body))
            .await?;
        let response: ScrollResponse = serde_json::from_value(value).map_err(RagError::store)?;

        Ok(response
            .result
            .points
            .into_iter()
            .map(|point| Point {
                id: point.id.as_str().map(str::to_string).unwrap_or_else(|| point.id.to_string()),
                vector: Vec::new(),
                payload: point.payload,
            })
            .collect())
    }
}
