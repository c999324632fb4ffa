use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::RagError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewChatRequest {
    pub id_token: String,
    pub first_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub id_token: String,
    pub chat_id: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub id_token: String,
    pub chat_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListChatsRequest {
    pub id_token: String,
}

pub async fn new_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewChatRequest>,
) -> Result<impl IntoResponse, RagError> {
    let user_id = state.verifier.verify(&payload.id_token).await?;
    let (chat_id, chat_title) = state
        .history
        .create_chat(&user_id, &payload.first_prompt)
        .await?;
    Ok(Json(json!({"chat_id": chat_id, "chat_title": chat_title})))
}

/// Ask-a-question flow. The message is written only after a successful
/// answer; a failure anywhere leaves nothing persisted.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, RagError> {
    let user_id = state.verifier.verify(&payload.id_token).await?;

    let answer = state.engine.ask(&payload.question).await?;
    state
        .history
        .append_message(
            &user_id,
            &payload.chat_id,
            &payload.question,
            &answer.text,
            answer.query_vector,
        )
        .await?;

    Ok(Json(json!({"response": answer.text})))
}

pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HistoryRequest>,
) -> Result<impl IntoResponse, RagError> {
    let user_id = state.verifier.verify(&payload.id_token).await?;
    let messages = state.history.get_history(&user_id, &payload.chat_id).await?;
    Ok(Json(json!({"messages": messages})))
}

pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ListChatsRequest>,
) -> Result<impl IntoResponse, RagError> {
    let user_id = state.verifier.verify(&payload.id_token).await?;
    let chats = state.history.list_chats(&user_id).await?;
    Ok(Json(json!({"chats": chats})))
}
