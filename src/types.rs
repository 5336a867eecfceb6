//! Common types used throughout hubspot-tap

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single extracted record: field name to value
pub type Record = JsonObject;

/// Partition-scoped key set narrowing a request (e.g. `{"list_id": 42}`)
///
/// Two contexts address the same partition when they compare equal.
pub type Context = JsonObject;

/// Build a context from key/value pairs
pub fn context<K, V, I>(pairs: I) -> Context
where
    K: Into<String>,
    V: Into<JsonValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Python-style truthiness for JSON values
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}
