//! Pagination types and traits
//!
//! Defines the page token and the paginator contract used by the request loop.

use crate::template::value_to_string;
use crate::types::{Context, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque continuation parameters for the next page
///
/// Each key becomes a query parameter. Tokens compare by deep equality, which
/// is what the request loop uses to detect a pagination loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(JsonObject);

impl PageToken {
    /// Create a token from a JSON object
    pub fn new(fields: JsonObject) -> Self {
        Self(fields)
    }

    /// Create a token holding a single continuation field
    pub fn single(key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        let mut fields = JsonObject::new();
        fields.insert(key.into(), value.into());
        Self(fields)
    }

    /// Get a continuation field
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Token fields as query parameters, in insertion order
    pub fn to_params(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect()
    }

    /// Borrow the underlying object
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// Trait for pagination strategies
///
/// Implementations are stateless: everything needed to compute the next page
/// comes from the response body and the token that requested it.
pub trait Paginator: Send + Sync {
    /// Query parameters for a page request
    ///
    /// `token` is `None` for the first page.
    fn url_params(&self, context: Option<&Context>, token: Option<&PageToken>)
        -> Vec<(String, String)>;

    /// Compute the token for the next page, or `None` when pagination is done
    fn next_page_token(&self, body: &JsonValue, previous: Option<&PageToken>)
        -> Option<PageToken>;
}
