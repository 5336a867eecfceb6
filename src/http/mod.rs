//! HTTP module
//!
//! Transport, response classification and retry.
//!
//! # Features
//!
//! - **Single-attempt transport**: [`HttpClient::send`] issues one GET and
//!   classifies the status with [`validate_response`]
//! - **Retry**: [`retry`] wraps any request-shaped operation with an
//!   exponential backoff schedule (factor 3, 8 attempts by default)
//! - **Throttling**: optional token bucket limiter using governor

mod client;
mod rate_limit;
mod retry;

pub use client::{
    validate_response, HttpClient, HttpClientConfig, HttpClientConfigBuilder, PreparedRequest,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{retry, Backoff, RetryPolicy, DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_TRIES};
