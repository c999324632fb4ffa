use std::sync::Arc;

use crate::auth::{
    GoogleIdVerifier, IdentityVerifier, MetadataTokenProvider, ServiceAccountTokenProvider,
    TokenProvider,
};
use crate::config::{AppConfig, CredentialSource};
use crate::core::errors::RagError;
use crate::history::{ChatHistory, CHATS_COLLECTION, MESSAGES_COLLECTION};
use crate::llm::{EmbeddingClient, GenerationClient, EMBEDDING_DIM};
use crate::rag::{RagEngine, KNOWLEDGE_BASE_COLLECTION};
use crate::store::qdrant::QdrantStore;
use crate::store::{Distance, VectorStore};

/// Shared application state. Everything inside is safe to use from any
/// request concurrently; the only mutable piece is the token cache, which
/// tolerates refresh races.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub engine: Arc<RagEngine>,
    pub history: ChatHistory,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        engine: Arc<RagEngine>,
        history: ChatHistory,
    ) -> Self {
        Self {
            verifier,
            engine,
            history,
        }
    }

    /// Wire up the real services from configuration and make sure the store
    /// collections and payload indexes exist.
    pub async fn initialize(config: &AppConfig) -> Result<Arc<Self>, RagError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|err| RagError::Config(format!("http client: {}", err)))?;

        let tokens: Arc<dyn TokenProvider> = match &config.vertex.credentials {
            CredentialSource::Workload => Arc::new(MetadataTokenProvider::new(http.clone())),
            CredentialSource::KeyFile(path) => Arc::new(ServiceAccountTokenProvider::from_key_file(
                http.clone(),
                path,
            )?),
        };

        let store: Arc<dyn VectorStore> =
            Arc::new(QdrantStore::new(http.clone(), config.qdrant.clone()));
        init_collections(store.as_ref()).await?;

        let embeddings = Arc::new(EmbeddingClient::new(
            http.clone(),
            config.vertex.clone(),
            tokens.clone(),
        ));
        let generation = Arc::new(GenerationClient::new(
            http.clone(),
            config.vertex.clone(),
            tokens,
        ));
        let engine = Arc::new(RagEngine::new(embeddings, generation, store.clone()));
        let history = ChatHistory::new(store);

        let verifier: Arc<dyn IdentityVerifier> = Arc::new(GoogleIdVerifier::new(
            http,
            config.tokeninfo_endpoint.clone(),
            config.google_client_id.clone(),
        ));

        Ok(Arc::new(Self::new(verifier, engine, history)))
    }
}

async fn init_collections(store: &dyn VectorStore) -> Result<(), RagError> {
    for name in [
        KNOWLEDGE_BASE_COLLECTION,
        CHATS_COLLECTION,
        MESSAGES_COLLECTION,
    ] {
        store
            .ensure_collection(name, EMBEDDING_DIM, Distance::Cosine)
            .await?;
    }

    for field in ["user_id", "chat_id"] {
        store.create_payload_index(MESSAGES_COLLECTION, field).await?;
    }
    for field in ["user_id", "chat_id", "chat_title"] {
        store.create_payload_index(CHATS_COLLECTION, field).await?;
    }

    Ok(())
}
