use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;

/// Identity resolved from a validated bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("bearer token rejected by identity provider")]
    Rejected,

    #[error("identity provider unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("unexpected identity provider response: {0}")]
    Provider(String),
}

/// Validates bearer tokens against the Supabase auth endpoint. Token
/// verification is fully delegated; this service holds no user state.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    /// Resolve an opaque bearer token to a user identity, or reject it.
    pub async fn resolve_user(&self, bearer_token: &str) -> Result<UserIdentity, AuthError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", bearer_token))
            .header("apikey", &self.anon_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserIdentity = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Provider(e.to_string()))?;
                debug!(user_id = %user.id, "Bearer token validated");
                Ok(user)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Bearer token rejected by identity provider");
                Err(AuthError::Rejected)
            }
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                warn!(status = %status, "Unexpected response from identity provider");
                Err(AuthError::Provider(format!("{}: {}", status, body)))
            }
        }
    }
}
