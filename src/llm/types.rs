use serde::Serialize;

/// Dimensionality of the embedding model output. Every collection in the
/// store is declared with this size, including the dummy vectors on chats.
pub const EMBEDDING_DIM: usize = 3072;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_k: i64,
    pub top_p: f64,
    pub max_output_tokens: i64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 1.0,
            max_output_tokens: 512,
        }
    }
}
