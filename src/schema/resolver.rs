//! Schema resolution from the properties metadata endpoint

use super::types::{FieldMetadata, Property, SchemaDefinition};
use crate::client::ApiClient;
use crate::error::{Error, Result};
use serde_json::Value;
use tracing::debug;

/// Resolve a stream's schema
///
/// Starts from `base_properties` and, when `properties_path` is set, appends
/// every non-deleted field from one authenticated GET of that endpoint, in
/// response order. Duplicate names keep their first definition. The request
/// goes through the client's retry policy; non-2xx statuses are classified the
/// same way as page requests.
pub async fn resolve_schema(
    api: &ApiClient,
    base_properties: &[Property],
    properties_path: Option<&str>,
) -> Result<SchemaDefinition> {
    let mut schema = SchemaDefinition::new(base_properties.iter().cloned());

    let Some(properties_path) = properties_path else {
        return Ok(schema);
    };

    let url = api.url(properties_path);
    let body = api.get_json(&url, &[]).await?;
    let fields = parse_field_metadata(body)?;

    let mut skipped = 0usize;
    for field in fields {
        if field.is_deleted() {
            continue;
        }
        if !schema.push(field.to_property()) {
            skipped += 1;
        }
    }

    debug!(
        endpoint = %properties_path,
        fields = schema.len(),
        duplicates = skipped,
        "Resolved schema"
    );

    Ok(schema)
}

/// Parse a metadata response body: a JSON array of field objects
pub fn parse_field_metadata(body: Value) -> Result<Vec<FieldMetadata>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(|e| Error::decode(format!("Invalid field metadata: {e}")))
            })
            .collect(),
        other => Err(Error::decode(format!(
            "Expected a JSON array of field definitions, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
