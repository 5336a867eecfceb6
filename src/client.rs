//! Authenticated API access
//!
//! [`ApiClient`] bundles the transport, the authenticator, the retry policy
//! and the base URL. Both the schema resolver and the request loop go through
//! [`ApiClient::get_json`], so metadata calls and page calls share one retry
//! and auth behavior.

use crate::auth::Authenticator;
use crate::error::Result;
use crate::http::{retry, HttpClient, PreparedRequest, RetryPolicy};
use serde_json::Value;
use std::sync::Arc;

/// Default API base URL
pub const DEFAULT_URL_BASE: &str = "https://api.hubapi.com/";

/// Transport + credentials + retry policy
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<HttpClient>,
    authenticator: Arc<dyn Authenticator>,
    retry: RetryPolicy,
    url_base: String,
}

impl ApiClient {
    /// Create a client with the default retry policy and base URL
    pub fn new(http: HttpClient, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            http: Arc::new(http),
            authenticator,
            retry: RetryPolicy::default(),
            url_base: DEFAULT_URL_BASE.to_string(),
        }
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_url_base(mut self, url_base: impl Into<String>) -> Self {
        self.url_base = url_base.into();
        self
    }

    /// The base URL
    pub fn url_base(&self) -> &str {
        &self.url_base
    }

    /// The retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The underlying transport
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Join a relative path onto the base URL
    ///
    /// Absolute `http(s)://` URLs are returned unchanged.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.url_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Authenticated GET with retry, returning the parsed JSON body
    ///
    /// Credentials are fetched for every attempt. A 401 invalidates the
    /// authenticator's cached credentials before the next attempt.
    pub async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        retry(&self.retry, |_attempt| async move {
            let mut request = PreparedRequest::new(url);
            request.query = query.to_vec();
            request.headers = self.authenticator.auth_headers().await?;

            match self.http.get_json(&request).await {
                Err(err) if err.status() == Some(401) => {
                    self.authenticator.invalidate().await;
                    Err(err)
                }
                result => result,
            }
        })
        .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("http", &self.http)
            .field("retry", &self.retry)
            .field("url_base", &self.url_base)
            .finish_non_exhaustive()
    }
}
