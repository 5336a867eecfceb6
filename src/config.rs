//! Tap configuration
//!
//! A [`TapConfig`] is the JSON document a run is started with. It carries the
//! credentials and the tuning knobs of the HTTP layer, and builds the
//! authenticator, HTTP client and retry policy from them.

use crate::auth::{AuthConfig, ConfiguredAuthenticator, DEFAULT_TOKEN_URL};
use crate::client::{ApiClient, DEFAULT_URL_BASE};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RetryPolicy, DEFAULT_MAX_TRIES};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Complete tap configuration loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapConfig {
    // ============================================================================
    // Credentials
    // ============================================================================
    /// Private app token, used instead of the OAuth2 fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// OAuth2 client ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth2 client secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// OAuth2 refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// OAuth2 redirect URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// OAuth2 token endpoint, HubSpot's when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    // ============================================================================
    // Sync
    // ============================================================================
    /// Earliest replication value for streams without a bookmark
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// Page size override for every stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    // ============================================================================
    // HTTP
    // ============================================================================
    /// User agent sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_base: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Attempts per request, first try included
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Client-side throttle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<u32>,
}

fn default_request_timeout() -> u64 {
    300
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_tries() -> u32 {
    DEFAULT_MAX_TRIES
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            client_id: None,
            client_secret: None,
            refresh_token: None,
            redirect_uri: None,
            token_url: None,
            start_date: None,
            page_size: None,
            user_agent: None,
            url_base: None,
            request_timeout: default_request_timeout(),
            backoff_base_ms: default_backoff_base_ms(),
            max_tries: default_max_tries(),
            requests_per_second: None,
        }
    }
}

impl TapConfig {
    /// Parse a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a config from a JSON value
    pub fn from_value(value: JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Effective API base URL
    pub fn url_base(&self) -> &str {
        self.url_base.as_deref().unwrap_or(DEFAULT_URL_BASE)
    }

    /// Authentication from the configured credentials
    ///
    /// A private app token takes precedence. Otherwise all three OAuth2
    /// fields are required.
    pub fn auth_config(&self) -> Result<AuthConfig> {
        if let Some(token) = &self.access_token {
            return Ok(AuthConfig::Bearer {
                token: token.clone(),
            });
        }

        let Some(refresh_token) = &self.refresh_token else {
            return Err(Error::missing_field("access_token"));
        };
        let client_id = self
            .client_id
            .clone()
            .ok_or_else(|| Error::missing_field("client_id"))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or_else(|| Error::missing_field("client_secret"))?;

        Ok(AuthConfig::Oauth2Refresh {
            token_url: self
                .token_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            client_id,
            client_secret,
            refresh_token: refresh_token.clone(),
            redirect_uri: self.redirect_uri.clone(),
        })
    }

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder =
            HttpClientConfig::builder().timeout(Duration::from_secs(self.request_timeout));
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        if let Some(rps) = self.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        builder.build()
    }

    /// Retry policy
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        if self.max_tries == 0 {
            return Err(Error::config("max_tries must be at least 1"));
        }
        Ok(RetryPolicy::exponential(
            Duration::from_millis(self.backoff_base_ms),
            self.max_tries,
        ))
    }

    /// A fully wired API client
    pub fn api_client(&self) -> Result<ApiClient> {
        let http = HttpClient::with_config(self.http_client_config())?;
        let auth = ConfiguredAuthenticator::new(self.auth_config()?);
        Ok(ApiClient::new(http, Arc::new(auth))
            .with_url_base(self.url_base())
            .with_retry(self.retry_policy()?))
    }
}
