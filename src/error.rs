//! Error types for hubspot-tap
//!
//! Every public API returns `Result<T, Error>`. Errors fall into four groups:
//! retriable (transient server, throttling and transport faults), fatal client
//! errors, structural defects (pagination loops, missing state) and
//! configuration problems.

use thiserror::Error;

/// The main error type for hubspot-tap
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    RetriableApi { status: u16, message: String },

    #[error("{message}")]
    FatalApi { status: u16, message: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<Error> },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    #[error("Loop detected in pagination of '{stream}' on page {page}: token {token} is identical to prior token")]
    PaginationLoop {
        stream: String,
        page: usize,
        token: String,
    },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("Cannot write state to missing state dictionary")]
    StateNotInitialized,

    #[error("State error: {message}")]
    State { message: String },

    #[error("Unsorted data detected in sorted stream '{stream}': {message}")]
    InvalidStreamSort { stream: String, message: String },

    // ============================================================================
    // I/O and Generic Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid credentials error
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Classify a transport-level failure from reqwest
    ///
    /// Timeouts and connection/protocol failures are retriable, anything else
    /// (builder errors, redirect loops, decode errors) is not.
    pub fn from_transport(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Connection {
                message: err.to_string(),
            }
        } else {
            Self::Http(err)
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RetriableApi { .. } | Error::Connection { .. } | Error::Timeout { .. }
        )
    }

    /// HTTP status carried by an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RetriableApi { status, .. } | Error::FatalApi { status, .. } => Some(*status),
            Error::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

/// Result type alias for hubspot-tap
pub type Result<T> = std::result::Result<T, Error>;
