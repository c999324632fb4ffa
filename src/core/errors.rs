use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for the RAG pipeline and chat storage.
///
/// Upstream 401s are handled inside the clients (refresh + one retry);
/// everything that reaches this type propagates unmodified to the request
/// boundary.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("embedding service error ({status}): {body}")]
    EmbeddingService { status: u16, body: String },
    #[error("generation service error ({status}): {body}")]
    GenerationService { status: u16, body: String },
    #[error("generation response malformed: {0}")]
    GenerationParse(String),
    #[error("vector store error: {0}")]
    Store(String),
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl RagError {
    pub fn auth<E: std::fmt::Display>(err: E) -> Self {
        RagError::Auth(err.to_string())
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RagError::Store(err.to_string())
    }

    /// Map a transport-level failure against the named service, keeping
    /// timeouts as their own kind.
    pub fn transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RagError::Timeout(service.to_string())
        } else {
            RagError::Store(format!("{}: {}", service, err))
        }
    }
}

impl IntoResponse for RagError {
    fn into_response(self) -> axum::response::Response {
        // Client-facing bodies stay generic; the detail goes to the log.
        let (status, message) = match &self {
            RagError::Auth(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            RagError::EmbeddingService { .. }
            | RagError::GenerationService { .. }
            | RagError::GenerationParse(_)
            | RagError::Timeout(_) => (StatusCode::BAD_GATEWAY, "Upstream service error"),
            RagError::Store(_) | RagError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        };

        tracing::error!("request failed: {}", self);

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
