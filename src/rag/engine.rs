//! End-to-end ask-a-question flow: embed, search, assemble, generate.

use std::sync::Arc;

use crate::core::errors::RagError;
use crate::llm::{EmbeddingClient, GenerationClient};
use crate::store::{ScoredPoint, VectorStore};

use super::prompt::{build_prompt, ContextDoc};

/// Collection holding the pre-indexed Q&A knowledge base.
pub const KNOWLEDGE_BASE_COLLECTION: &str = "knowledge_base";

const DEFAULT_TOP_K: usize = 3;

/// A generated answer plus the query embedding that produced it. The vector
/// travels with the answer so the caller can persist the message without
/// re-embedding the question.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub query_vector: Vec<f32>,
}

pub struct RagEngine {
    embeddings: Arc<EmbeddingClient>,
    generation: Arc<GenerationClient>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl RagEngine {
    pub fn new(
        embeddings: Arc<EmbeddingClient>,
        generation: Arc<GenerationClient>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embeddings,
            generation,
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Linear pipeline; every failure propagates unmodified. The only retry
    /// behavior in the system lives inside the two clients.
    pub async fn ask(&self, question: &str) -> Result<Answer, RagError> {
        let query_vector = self.embeddings.embed(question).await?;

        let hits = self
            .store
            .search(KNOWLEDGE_BASE_COLLECTION, &query_vector, self.top_k)
            .await?;
        let docs = project_context(&hits);

        let prompt = build_prompt(question, &docs);
        let text = self.generation.generate(&prompt).await?;

        Ok(Answer { text, query_vector })
    }
}

fn project_context(hits: &[ScoredPoint]) -> Vec<ContextDoc> {
    hits.iter()
        .map(|hit| ContextDoc::from_payload(&hit.payload))
        .collect()
}
