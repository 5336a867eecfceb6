//! Authenticator implementation
//!
//! Supplies auth headers on demand and manages access-token refresh.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Source of credentials for API requests
///
/// Implementations return the headers to attach to the next request. An
/// `InvalidCredentials` error means the credentials can never succeed and the
/// caller must not retry.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Headers to attach to the next request
    async fn auth_headers(&self) -> Result<HashMap<String, String>>;

    /// Drop any cached credentials so the next call fetches fresh ones
    async fn invalidate(&self) {}
}

/// Authenticator driven by an [`AuthConfig`]
pub struct ConfiguredAuthenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached access token for OAuth2
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl ConfiguredAuthenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.token.clone());
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.token.clone());
        }

        let new_token = self.refresh_access_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Exchange the refresh token for a new access token
    async fn refresh_access_token(&self) -> Result<CachedToken> {
        let AuthConfig::Oauth2Refresh {
            token_url,
            client_id,
            client_secret,
            refresh_token,
            redirect_uri,
        } = &self.config
        else {
            return Err(Error::TokenRefresh {
                message: "Token refresh not supported for this auth type".to_string(),
            });
        };

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        if let Some(uri) = redirect_uri {
            form.push(("redirect_uri", uri.as_str()));
        }

        debug!(token_url = %token_url, "Refreshing OAuth2 access token");

        let response = self
            .http_client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!(
                "Refresh token request failed with status {}: {body}",
                status.as_u16()
            );
            // 400/401 from the token endpoint means the refresh token or client
            // credentials were revoked
            return Err(match status.as_u16() {
                400 | 401 => Error::invalid_credentials(message),
                _ => Error::TokenRefresh { message },
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        info!(
            expires_in = ?token_response.expires_in,
            "OAuth2 access token refreshed"
        );
        Ok(token_response.into_cached_token())
    }
}

#[async_trait]
impl Authenticator for ConfiguredAuthenticator {
    async fn auth_headers(&self) -> Result<HashMap<String, String>> {
        let mut headers = HashMap::new();
        match &self.config {
            AuthConfig::None => {}

            AuthConfig::Bearer { token } => {
                headers.insert("Authorization".to_string(), format!("Bearer {token}"));
            }

            AuthConfig::ApiKey {
                header_name,
                prefix,
                value,
            } => {
                let header = header_name.as_deref().unwrap_or("Authorization");
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                headers.insert(header.to_string(), val);
            }

            AuthConfig::Oauth2Refresh { .. } => {
                let token = self.get_or_refresh_token().await?;
                headers.insert("Authorization".to_string(), format!("Bearer {token}"));
            }

            AuthConfig::CustomHeaders { headers: custom } => {
                headers.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        Ok(headers)
    }

    async fn invalidate(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }
}

impl std::fmt::Debug for ConfiguredAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.config {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ApiKey { .. } => "api_key",
            AuthConfig::Oauth2Refresh { .. } => "oauth2_refresh",
            AuthConfig::CustomHeaders { .. } => "custom_headers",
        };
        f.debug_struct("ConfiguredAuthenticator")
            .field("kind", &kind)
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}
