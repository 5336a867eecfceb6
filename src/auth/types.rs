//! Auth configuration types

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

/// Default HubSpot OAuth2 token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://api.hubapi.com/oauth/v1/token";

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Static bearer token (private app token)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// API key sent in a header
    ApiKey {
        /// Header name, `Authorization` when absent
        header_name: Option<String>,
        /// Prefix to add before the value (e.g., "Bearer ")
        prefix: Option<String>,
        /// The API key value
        value: String,
    },

    /// OAuth2 refresh token flow
    Oauth2Refresh {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
        /// Redirect URI registered with the app, when the provider requires it
        redirect_uri: Option<String>,
    },

    /// Custom headers
    CustomHeaders {
        /// Headers to add to each request
        headers: HashMap<String, String>,
    },
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    ///
    /// A lifetime too large to represent is treated as no expiry.
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at =
            TimeDelta::try_seconds(seconds).and_then(|ttl| Utc::now().checked_add_signed(ttl));
        Self { token, expires_at }
    }

    /// Check if the token is expired (with 60 second buffer)
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Utc::now() + TimeDelta::seconds(60) >= expires_at)
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_inside_buffer_is_expired() {
        let token = CachedToken::expires_in("test".to_string(), 30);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_out_of_range_lifetime_never_expires() {
        let token = CachedToken::expires_in("test".to_string(), i64::MAX);
        assert!(token.expires_at.is_none());
        assert!(!token.is_expired());

        let token = CachedToken::expires_in("test".to_string(), i64::MAX / 1000);
        assert!(token.expires_at.is_none());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_auth_config_default() {
        assert!(matches!(AuthConfig::default(), AuthConfig::None));
    }
}
