//! Environment-derived configuration.
//!
//! Everything is read once at startup into an explicit value object and
//! passed into constructors; no module reads the environment after this.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::errors::RagError;

pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Where the Vertex bearer token comes from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Ambient workload identity via the GCP metadata server.
    Workload,
    /// Explicit service-account key file.
    KeyFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    /// Base endpoint, overridable for tests.
    pub endpoint: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub credentials: CredentialSource,
}

impl VertexConfig {
    /// Full `:predict` / `:generateContent` model URL.
    pub fn model_url(&self, model: &str, verb: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.endpoint.trim_end_matches('/'),
            self.project_id,
            self.location,
            model,
            verb
        )
    }
}

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub http_timeout: Duration,
    pub vertex: VertexConfig,
    pub qdrant: QdrantConfig,
    /// OAuth client id the incoming id tokens must be issued for.
    pub google_client_id: String,
    pub tokeninfo_endpoint: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, RagError> {
        let location = optional("GCP_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let endpoint = optional("VERTEX_ENDPOINT")
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", location));

        let credentials = match optional("GOOGLE_APPLICATION_CREDENTIALS") {
            Some(path) if !path.trim().is_empty() => CredentialSource::KeyFile(PathBuf::from(path)),
            _ => CredentialSource::Workload,
        };

        let port = optional("PORT")
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(8080);
        let http_timeout = optional("HTTP_TIMEOUT_SECS")
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            port,
            http_timeout,
            vertex: VertexConfig {
                project_id: required("GCP_PROJECT_ID")?,
                location,
                endpoint,
                embedding_model: optional("EMBEDDING_MODEL_ID")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                generation_model: optional("GENERATION_MODEL_ID")
                    .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
                credentials,
            },
            qdrant: QdrantConfig {
                url: required("QDRANT_URL")?,
                api_key: optional("QDRANT_API_KEY"),
            },
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            tokeninfo_endpoint: optional("TOKENINFO_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_TOKENINFO_ENDPOINT.to_string()),
        })
    }
}

fn required(name: &str) -> Result<String, RagError> {
    optional(name)
        .ok_or_else(|| RagError::Config(format!("required environment variable '{}' not set", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.is_empty())
}
