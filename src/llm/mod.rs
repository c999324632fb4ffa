//! Clients for the hosted embedding and generation models.

pub mod embeddings;
pub mod generation;
pub mod types;

#[cfg(test)]
mod tests;

pub use embeddings::EmbeddingClient;
pub use generation::GenerationClient;
pub use types::{GenerationOptions, EMBEDDING_DIM};
