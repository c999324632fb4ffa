//! Prompt assembly.
//!
//! Pure string work: no randomness, no I/O. The whole module is testable by
//! string equality.

use serde_json::Value;

/// A retrieved Q&A pair, already stripped of score and store metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDoc {
    pub question: String,
    pub answer: String,
}

impl ContextDoc {
    /// Project a search-result payload down to the two fields the prompt
    /// needs. Missing or non-string fields become empty strings.
    pub fn from_payload(payload: &Value) -> Self {
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            question: field("question"),
            answer: field("answer"),
        }
    }
}

const PERSONA: &str = "\
You are a knowledgeable assistant answering questions on behalf of the site owner, \
grounded in the reference material below. Be detailed when necessary but concise \
overall, and keep a professional, friendly tone.

Ground every answer in the provided context. If the context does not cover the \
question, acknowledge that instead of inventing details. Never contradict the \
context.";

/// Render the persona, the retrieved context, and the verbatim question into
/// a single generation prompt. Deterministic; identical inputs give identical
/// output.
pub fn build_prompt(question: &str, context_docs: &[ContextDoc]) -> String {
    let context = context_docs
        .iter()
        .map(|doc| format!("Q: {}\nA: {}", doc.question.trim(), doc.answer.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nContext:\n{}\n\nUser Question: {}\n\nAnswer:",
        PERSONA, context, question
    )
    .trim()
    .to_string()
}
