//! Identity verification for incoming requests.
//!
//! The id token is opaque to the rest of the system; everything downstream
//! only ever sees the stable `sub` claim as `user_id`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::errors::RagError;

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Validate an id token and return the stable user id.
    async fn verify(&self, id_token: &str) -> Result<String, RagError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
    aud: String,
    exp: String,
}

/// Verifies Google-issued id tokens against the tokeninfo endpoint, then
/// checks audience and expiry locally.
pub struct GoogleIdVerifier {
    client: Client,
    endpoint: String,
    client_id: String,
}

impl GoogleIdVerifier {
    pub fn new(client: Client, endpoint: String, client_id: String) -> Self {
        Self {
            client,
            endpoint,
            client_id,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdVerifier {
    async fn verify(&self, id_token: &str) -> Result<String, RagError> {
        let res = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RagError::Timeout("tokeninfo".to_string())
                } else {
                    RagError::Auth(format!("tokeninfo: {}", err))
                }
            })?;

        if !res.status().is_success() {
            return Err(RagError::Auth(format!(
                "id token rejected ({})",
                res.status()
            )));
        }

        let info: TokenInfo = res.json().await.map_err(RagError::auth)?;

        if info.aud != self.client_id {
            return Err(RagError::Auth("id token audience mismatch".to_string()));
        }

        let exp = info
            .exp
            .parse::<i64>()
            .map_err(|_| RagError::Auth("id token carries malformed expiry".to_string()))?;
        if exp <= chrono::Utc::now().timestamp() {
            return Err(RagError::Auth("id token expired".to_string()));
        }

        Ok(info.sub)
    }
}
