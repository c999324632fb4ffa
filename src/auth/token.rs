//! Bearer-token acquisition for the Vertex endpoints.
//!
//! Two credential sources, picked once at startup:
//! - ambient workload identity (GCP metadata server)
//! - an explicit service-account key file (RS256 JWT-bearer exchange)
//!
//! Both cache the token until shortly before expiry. A cached token that has
//! gone stale server-side shows up as a 401 downstream; the clients call
//! `refresh` and retry exactly once.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::errors::RagError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the advertised expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a cached token, fetching if the cache is empty or near expiry.
    async fn token(&self) -> Result<String, RagError>;

    /// Drop the cache and fetch a fresh token. Called by the clients after a
    /// downstream 401. Safe under concurrent invocation; a race that fetches
    /// two tokens just wastes one.
    async fn refresh(&self) -> Result<String, RagError>;
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

struct TokenCache {
    slot: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    async fn fresh(&self) -> Option<String> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| cached.expires_at.saturating_duration_since(Instant::now()) > EXPIRY_SKEW)
            .map(|cached| cached.value.clone())
    }

    async fn store(&self, value: String, expires_in: u64) -> String {
        let cached = CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        };
        *self.slot.write().await = Some(cached);
        value
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

/// Ambient workload identity via the GCP metadata server.
pub struct MetadataTokenProvider {
    client: Client,
    endpoint: String,
    cache: TokenCache,
}

impl MetadataTokenProvider {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, METADATA_TOKEN_URL.to_string())
    }

    pub fn with_endpoint(client: Client, endpoint: String) -> Self {
        Self {
            client,
            endpoint,
            cache: TokenCache::new(),
        }
    }

    async fn fetch(&self) -> Result<String, RagError> {
        let res = self
            .client
            .get(&self.endpoint)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|err| credential_error("metadata server", err))?;

        if !res.status().is_success() {
            return Err(RagError::Auth(format!(
                "metadata server returned {}",
                res.status()
            )));
        }

        let token: TokenResponse = res.json().await.map_err(RagError::auth)?;
        Ok(self.cache.store(token.access_token, token.expires_in).await)
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn token(&self) -> Result<String, RagError> {
        if let Some(token) = self.cache.fresh().await {
            return Ok(token);
        }
        self.fetch().await
    }

    async fn refresh(&self) -> Result<String, RagError> {
        self.fetch().await
    }
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Explicit key-file credentials: sign a JWT assertion with the service
/// account's RSA key and exchange it at the key's token endpoint.
pub struct ServiceAccountTokenProvider {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    cache: TokenCache,
}

impl ServiceAccountTokenProvider {
    pub fn from_key_file(client: Client, path: &Path) -> Result<Self, RagError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            RagError::Auth(format!("cannot read key file {}: {}", path.display(), err))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|err| RagError::Auth(format!("malformed key file: {}", err)))?;
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|err| RagError::Auth(format!("invalid private key: {}", err)))?;

        Ok(Self {
            client,
            key,
            encoding_key,
            cache: TokenCache::new(),
        })
    }

    async fn fetch(&self) -> Result<String, RagError> {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &self.key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(RagError::auth)?;

        let res = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|err| credential_error("token endpoint", err))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::Auth(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = res.json().await.map_err(RagError::auth)?;
        Ok(self.cache.store(token.access_token, token.expires_in).await)
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn token(&self) -> Result<String, RagError> {
        if let Some(token) = self.cache.fresh().await {
            return Ok(token);
        }
        self.fetch().await
    }

    async fn refresh(&self) -> Result<String, RagError> {
        self.fetch().await
    }
}

fn credential_error(service: &str, err: reqwest::Error) -> RagError {
    if err.is_timeout() {
        RagError::Timeout(service.to_string())
    } else {
        RagError::Auth(format!("{}: {}", service, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_returns_unexpired_token() {
        let cache = TokenCache::new();
        cache.store("tok-1".to_string(), 3600).await;
        assert_eq!(cache.fresh().await.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn cache_treats_near_expiry_as_stale() {
        let cache = TokenCache::new();
        // Inside the 60s skew window: must be refetched.
        cache.store("tok-1".to_string(), 30).await;
        assert_eq!(cache.fresh().await, None);
    }

    #[tokio::test]
    async fn store_overwrites_previous_token() {
        let cache = TokenCache::new();
        cache.store("tok-1".to_string(), 3600).await;
        cache.store("tok-2".to_string(), 3600).await;
        assert_eq!(cache.fresh().await.as_deref(), Some("tok-2"));
    }
}
