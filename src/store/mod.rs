//! Vector store gateway.
//!
//! The store doubles as a document database: the chat collections only use
//! payload fields, with the vector either a real question embedding
//! (`messages`) or a fixed dummy (`chats`). Store-specific result rows never
//! leave this module; everything upstream sees `Point` and `ScoredPoint`.

pub mod qdrant;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::RagError;

/// Distance metric a collection is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }
}

/// One stored point: id, vector, and arbitrary payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A similarity search hit, already stripped to payload and score.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub payload: Value,
    pub score: f32,
}

/// Exact-match condition on one payload field. Filters combine as a
/// conjunction.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub key: String,
    pub value: String,
}

impl FieldFilter {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist. Never recreates: repeated
    /// calls in the steady state must not touch existing data.
    async fn ensure_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<(), RagError>;

    /// Declare a keyword index on a payload field so exact-match filters stay
    /// cheap. Idempotent.
    async fn create_payload_index(&self, collection: &str, field: &str) -> Result<(), RagError>;

    /// Nearest neighbors, highest similarity first, at most `top_k` rows.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, RagError>;

    /// Write one point; idempotent per id.
    async fn upsert(&self, collection: &str, point: Point) -> Result<(), RagError>;

    /// All points matching the filter conjunction, up to `limit`. No ordering
    /// guarantee.
    async fn scroll(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        limit: usize,
    ) -> Result<Vec<Point>, RagError>;
}
