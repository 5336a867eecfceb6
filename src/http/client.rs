//! HTTP transport
//!
//! A thin send/receive primitive. Each call makes exactly one attempt; retries
//! are layered on top with [`super::retry`]. Every completed request is logged
//! with its duration and status.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Optional client-side throttle
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            timeout: Duration::from_secs(300),
            rate_limit: None,
            default_headers,
            user_agent: format!("hubspot-tap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// A fully resolved GET request: URL, query parameters and headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedRequest {
    /// Absolute URL
    pub url: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Request headers (auth included)
    pub headers: HashMap<String, String>,
}

impl PreparedRequest {
    /// Create a request for a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Path component of the URL, used in logs and error messages
    pub fn path(&self) -> String {
        url::Url::parse(&self.url)
            .map(|parsed| parsed.path().to_string())
            .unwrap_or_else(|_| self.url.clone())
    }
}

/// HTTP client: one attempt per call, with optional throttling
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Send a request once and validate the response status
    pub async fn send(&self, request: &PreparedRequest) -> Result<Response> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.get(&request.url);
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        let endpoint = request.path();
        let timeout_ms = self.config.timeout.as_millis() as u64;
        let started = Instant::now();
        let result = req.send().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                debug!(
                    endpoint = %endpoint,
                    duration_ms,
                    error = %e,
                    "Request failed"
                );
                return Err(Error::from_transport(e, timeout_ms));
            }
        };

        debug!(
            endpoint = %endpoint,
            status = response.status().as_u16(),
            duration_ms,
            "Request completed"
        );

        validate_response(response.status(), &endpoint)?;
        Ok(response)
    }

    /// Send a request once and parse the JSON body
    pub async fn get_json(&self, request: &PreparedRequest) -> Result<Value> {
        let response = self.send(request).await?;
        let timeout_ms = self.config.timeout.as_millis() as u64;
        let text = response
            .text()
            .await
            .map_err(|e| Error::from_transport(e, timeout_ms))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::decode(format!("Invalid JSON from {}: {e}", request.path())))
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Classify a response status
///
/// 401, 429 and 5xx are retriable; every other 4xx is a fatal client error.
/// Statuses outside 2xx/4xx/5xx are treated as fatal too.
pub fn validate_response(status: StatusCode, path: &str) -> Result<()> {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Unknown");

    if status.is_success() {
        Ok(())
    } else if status.is_server_error() || code == 429 || code == 401 {
        Err(Error::RetriableApi {
            status: code,
            message: format!("{code} Server Error: {reason} for path: {path}"),
        })
    } else if status.is_client_error() {
        Err(Error::FatalApi {
            status: code,
            message: format!("{code} Client Error: {reason} for path: {path}"),
        })
    } else {
        Err(Error::FatalApi {
            status: code,
            message: format!("{code} Unexpected status: {reason} for path: {path}"),
        })
    }
}
