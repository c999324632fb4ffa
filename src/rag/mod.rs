//! Retrieval-augmented generation pipeline.
//!
//! - `prompt`: deterministic prompt assembly from retrieved Q&A pairs
//! - `engine`: the embed → search → assemble → generate orchestration

pub mod engine;
pub mod prompt;

pub use engine::{Answer, RagEngine, KNOWLEDGE_BASE_COLLECTION};
pub use prompt::{build_prompt, ContextDoc};
