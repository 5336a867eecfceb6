//! Parser implementations

use super::types::RecordParser;
use crate::error::{Error, Result};
use crate::types::Record;
use serde_json::Value;

// ============================================================================
// JSONPath Parser
// ============================================================================

/// Extracts records located at a JSONPath in the response body
///
/// Wildcard paths (`$.contacts[*]`) go through jsonpath-rust; plain
/// dot-notation paths (`$.results`, `data.items[0]`) are walked directly. A
/// path that matches nothing yields no records. Every record must be a JSON
/// object.
#[derive(Debug, Clone)]
pub struct JsonPathParser {
    records_path: String,
}

impl Default for JsonPathParser {
    fn default() -> Self {
        Self::new("$[*]")
    }
}

impl JsonPathParser {
    /// Create a parser for the given records path
    pub fn new(records_path: impl Into<String>) -> Self {
        Self {
            records_path: records_path.into(),
        }
    }

    /// The configured records path
    pub fn records_path(&self) -> &str {
        &self.records_path
    }

    fn extract(&self, body: &Value) -> Result<Vec<Value>> {
        let path = self.records_path.as_str();

        if matches!(path, "" | "$" | "$[*]" | "$.[*]") {
            return Ok(match body {
                Value::Array(arr) => arr.clone(),
                Value::Null => vec![],
                other => vec![other.clone()],
            });
        }

        // jsonpath-rust only for wildcards; negative indices stay on the
        // simple walker
        if path.contains('*') && !path.contains("[-") {
            extract_with_jsonpath(body, path)
        } else {
            Ok(match extract_simple_path(body, path) {
                Some(Value::Array(arr)) => arr,
                Some(Value::Null) | None => vec![],
                Some(v) => vec![v],
            })
        }
    }
}

impl RecordParser for JsonPathParser {
    fn parse(&self, body: &Value) -> Result<Vec<Record>> {
        self.extract(body)?
            .into_iter()
            .enumerate()
            .map(|(i, value)| match value {
                Value::Object(record) => Ok(record),
                other => Err(Error::decode(format!(
                    "Record {i} at '{}' is not an object: {other}",
                    self.records_path
                ))),
            })
            .collect()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        let Some(bracket_pos) = part.find('[') else {
            current = current.get(part)?;
            continue;
        };

        let name = &part[..bracket_pos];
        let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

        if !name.is_empty() {
            current = current.get(name)?;
        }

        let index = index_str.parse::<i64>().ok()?;
        let Value::Array(arr) = current else {
            return None;
        };
        let idx = if index < 0 {
            usize::try_from(i64::try_from(arr.len()).ok()? + index).ok()?
        } else {
            usize::try_from(index).ok()?
        };
        current = arr.get(idx)?;
    }

    Some(current.clone())
}

fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath '{path}': {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
