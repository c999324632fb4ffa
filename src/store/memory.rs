//! In-memory `VectorStore` used by engine and history tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::RagError;

use super::{Distance, FieldFilter, Point, ScoredPoint, VectorStore};

#[derive(Default)]
struct Collection {
    // Insertion order preserved so scroll reads are stable.
    points: Vec<Point>,
}

#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn matches(point: &Point, filters: &[FieldFilter]) -> bool {
    filters
        .iter()
        .all(|f| point.payload.get(&f.key).and_then(|v| v.as_str()) == Some(f.value.as_str()))
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(
        &self,
        name: &str,
        _vector_size: usize,
        _distance: Distance,
    ) -> Result<(), RagError> {
        let mut collections = self.collections.lock().unwrap();
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn create_payload_index(&self, _collection: &str, _field: &str) -> Result<(), RagError> {
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, RagError> {
        let collections = self.collections.lock().unwrap();
        let data = collections
            .get(collection)
            .ok_or_else(|| RagError::Store(format!("unknown collection '{}'", collection)))?;

        let mut hits: Vec<ScoredPoint> = data
            .points
            .iter()
            .map(|point| ScoredPoint {
                payload: point.payload.clone(),
                score: cosine_similarity(&point.vector, vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn upsert(&self, collection: &str, point: Point) -> Result<(), RagError> {
        let mut collections = self.collections.lock().unwrap();
        let data = collections
            .get_mut(collection)
            .ok_or_else(|| RagError::Store(format!("unknown collection '{}'", collection)))?;

        if let Some(existing) = data.points.iter_mut().find(|p| p.id == point.id) {
            *existing = point;
        } else {
            data.points.push(point);
        }
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        limit: usize,
    ) -> Result<Vec<Point>, RagError> {
        let collections = self.collections.lock().unwrap();
        let data = collections
            .get(collection)
            .ok_or_else(|| RagError::Store(format!("unknown collection '{}'", collection)))?;

        Ok(data
            .points
            .iter()
            .filter(|point| matches(point, filters))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, vector: Vec<f32>, payload: serde_json::Value) -> Point {
        Point {
            id: id.to_string(),
            vector,
            payload,
        }
    }

    #[tokio::test]
    async fn search_orders_by_score_and_caps_at_top_k() {
        let store = InMemoryStore::new();
        store.ensure_collection("kb", 2, Distance::Cosine).await.unwrap();
        store
            .upsert("kb", point("a", vec![1.0, 0.0], json!({"n": "a"})))
            .await
            .unwrap();
        store
            .upsert("kb", point("b", vec![0.9, 0.1], json!({"n": "b"})))
            .await
            .unwrap();
        store
            .upsert("kb", point("c", vec![0.0, 1.0], json!({"n": "c"})))
            .await
            .unwrap();

        let hits = store.search("kb", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].payload["n"], "a");
    }

    #[tokio::test]
    async fn ensure_collection_keeps_existing_points() {
        let store = InMemoryStore::new();
        store.ensure_collection("kb", 2, Distance::Cosine).await.unwrap();
        store
            .upsert("kb", point("a", vec![1.0, 0.0], json!({})))
            .await
            .unwrap();

        store.ensure_collection("kb", 2, Distance::Cosine).await.unwrap();
        let hits = store.search("kb", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_id() {
        let store = InMemoryStore::new();
        store.ensure_collection("kb", 2, Distance::Cosine).await.unwrap();
        store
            .upsert("kb", point("a", vec![1.0, 0.0], json!({"v": 1})))
            .await
            .unwrap();
        store
            .upsert("kb", point("a", vec![1.0, 0.0], json!({"v": 2})))
            .await
            .unwrap();

        let hits = store.search("kb", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload["v"], 2);
    }

    #[tokio::test]
    async fn scroll_applies_conjunction_filter() {
        let store = InMemoryStore::new();
        store.ensure_collection("msgs", 1, Distance::Cosine).await.unwrap();
        store
            .upsert(
                "msgs",
                point("1", vec![0.0], json!({"user_id": "u1", "chat_id": "c1"})),
            )
            .await
            .unwrap();
        store
            .upsert(
                "msgs",
                point("2", vec![0.0], json!({"user_id": "u2", "chat_id": "c1"})),
            )
            .await
            .unwrap();

        let filters = vec![
            FieldFilter::new("user_id", "u1"),
            FieldFilter::new("chat_id", "c1"),
        ];
        let points = store.scroll("msgs", &filters, 100).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "1");
    }
}
