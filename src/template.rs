//! URL template rendering
//!
//! Stream paths may reference partition keys with `{name}` placeholders, e.g.
//! `/contacts/v1/lists/{list_id}/contacts/all`. Values come from the request
//! context and are percent-encoded as single path segments.

use crate::error::{Error, Result};
use crate::types::Context;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

/// Regex for matching template variables: {variable}
static TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Render a path template with values from the context
///
/// Every placeholder must be present in the context; missing names are
/// reported together. Each value fills exactly one path segment, so `/`, `?`
/// and `#` inside a value are escaped.
pub fn render(template: &str, context: Option<&Context>) -> Result<String> {
    let mut missing = Vec::new();
    let mut invalid = None;

    let rendered = TEMPLATE_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match context.and_then(|ctx| ctx.get(name)) {
            Some(value) => match encode_path_segment(&value_to_string(value)) {
                Ok(segment) => segment,
                Err(e) => {
                    invalid.get_or_insert(e);
                    String::new()
                }
            },
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(Error::undefined_var(missing.join(", ")));
    }
    if let Some(e) = invalid {
        return Err(e);
    }
    Ok(rendered.into_owned())
}

/// Percent-encode a value as one URL path segment
pub fn encode_path_segment(value: &str) -> Result<String> {
    // Dot segments are dropped by the encoder
    match value {
        "." => return Ok("%2E".to_string()),
        ".." => return Ok("%2E%2E".to_string()),
        _ => {}
    }

    let mut url = Url::parse("http://localhost/")?;
    url.path_segments_mut()
        .map_err(|()| Error::config("URL cannot carry path segments"))?
        .clear()
        .push(value);
    Ok(url.path().trim_start_matches('/').to_string())
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Convert a JSON value to a string for templates and query parameters
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
