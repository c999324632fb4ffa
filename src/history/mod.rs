//! Chat sessions and message history on top of the vector store.
//!
//! Chats and messages live in their own collections, keyed entirely by
//! payload fields. A chat's vector is a fixed dummy (the collection schema
//! demands one); a message's vector is the real question embedding, computed
//! once by the orchestrator and passed through.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::RagError;
use crate::llm::EMBEDDING_DIM;
use crate::store::{FieldFilter, Point, VectorStore};

pub const CHATS_COLLECTION: &str = "chats";
pub const MESSAGES_COLLECTION: &str = "messages";

const SCROLL_LIMIT: usize = 100;
const MAX_TITLE_LEN: usize = 60;
const FALLBACK_TITLE: &str = "New chat";

#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub chat_id: String,
    pub chat_title: String,
}

/// One stored question/answer exchange. Messages are append-only; this is
/// the uniform representation everywhere (no role/turn splitting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

#[derive(Clone)]
pub struct ChatHistory {
    store: Arc<dyn VectorStore>,
}

impl ChatHistory {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Create a chat with a fresh id and a title derived from the first
    /// prompt. The title is fixed at creation and never mutated.
    pub async fn create_chat(
        &self,
        user_id: &str,
        first_prompt: &str,
    ) -> Result<(String, String), RagError> {
        let chat_id = Uuid::new_v4().to_string();
        let chat_title = derive_chat_title(first_prompt);

        let point = Point {
            id: chat_id.clone(),
            vector: vec![0.0; EMBEDDING_DIM],
            payload: json!({
                "user_id": user_id,
                "chat_id": chat_id,
                "chat_title": chat_title,
                "created_at": now(),
            }),
        };
        self.store.upsert(CHATS_COLLECTION, point).await?;

        tracing::debug!("created chat {} for user {}", chat_id, user_id);
        Ok((chat_id, chat_title))
    }

    /// Append one Q&A message. The vector is the question embedding already
    /// computed by the orchestrator; it is never recomputed here.
    pub async fn append_message(
        &self,
        user_id: &str,
        chat_id: &str,
        question: &str,
        answer: &str,
        vector: Vec<f32>,
    ) -> Result<(), RagError> {
        let message_id = Uuid::new_v4().to_string();
        let point = Point {
            id: message_id,
            vector,
            payload: json!({
                "user_id": user_id,
                "chat_id": chat_id,
                "question": question,
                "answer": answer,
                "created_at": now(),
            }),
        };
        self.store.upsert(MESSAGES_COLLECTION, point).await
    }

    /// Messages of one chat, insertion order. Filtering on both ids keeps a
    /// guessed chat_id from leaking another user's messages.
    pub async fn get_history(
        &self,
        user_id: &str,
        chat_id: &str,
    ) -> Result<Vec<QaPair>, RagError> {
        let filters = [
            FieldFilter::new("chat_id", chat_id),
            FieldFilter::new("user_id", user_id),
        ];
        let points = self
            .store
            .scroll(MESSAGES_COLLECTION, &filters, SCROLL_LIMIT)
            .await?;

        // Scroll gives no ordering; the created_at stamp restores it.
        let mut rows: Vec<(String, QaPair)> = points
            .iter()
            .filter_map(|point| {
                let question = point.payload.get("question")?.as_str()?;
                let answer = point.payload.get("answer")?.as_str()?;
                let created_at = point
                    .payload
                    .get("created_at")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Some((
                    created_at,
                    QaPair {
                        question: question.to_string(),
                        answer: answer.to_string(),
                    },
                ))
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(rows.into_iter().map(|(_, pair)| pair).collect())
    }

    /// All chats of one user. A user with no chats gets an empty list.
    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, RagError> {
        let filters = [FieldFilter::new("user_id", user_id)];
        let points = self
            .store
            .scroll(CHATS_COLLECTION, &filters, SCROLL_LIMIT)
            .await?;

        Ok(points
            .iter()
            .filter_map(|point| {
                let chat_id = point.payload.get("chat_id")?.as_str()?;
                let chat_title = point
                    .payload
                    .get("chat_title")
                    .and_then(|v| v.as_str())
                    .unwrap_or(FALLBACK_TITLE);
                Some(ChatSummary {
                    chat_id: chat_id.to_string(),
                    chat_title: chat_title.to_string(),
                })
            })
            .collect())
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Short label for a chat, cut from the first prompt at a word boundary.
/// Stand-in for a proper noun-phrase extractor.
fn derive_chat_title(first_prompt: &str) -> String {
    let collapsed = first_prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    if collapsed.chars().count() <= MAX_TITLE_LEN {
        return collapsed;
    }

    let mut title = String::new();
    for word in collapsed.split(' ') {
        if !title.is_empty() && title.chars().count() + word.chars().count() + 1 > MAX_TITLE_LEN {
            break;
        }
        if !title.is_empty() {
            title.push(' ');
        }
        title.push_str(word);
    }
    if title.is_empty() {
        // Single word longer than the cap.
        title = collapsed.chars().take(MAX_TITLE_LEN).collect();
    }
    format!("{}…", title)
}
