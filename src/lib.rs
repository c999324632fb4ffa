//! Retrieval-augmented question-answering backend.
//!
//! The pipeline embeds an incoming question, pulls the nearest indexed Q&A
//! pairs out of the vector store, folds them into a grounding prompt, and
//! forwards that to the hosted generation model. Per-user chat sessions and
//! message history live in the same vector store, keyed by payload fields.

pub mod auth;
pub mod config;
pub mod core;
pub mod history;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod server;
pub mod state;
pub mod store;

pub use crate::core::errors::RagError;
pub use config::AppConfig;
pub use state::AppState;
