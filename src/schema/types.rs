//! Schema types

use crate::types::{is_truthy, JsonObject, JsonValue, Record};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;

/// Semantic type of a field
///
/// Numeric API fields are deliberately typed as strings so values keep their
/// exact textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    DateTime,
    Boolean,
}

impl SemanticType {
    /// Map an API field type tag to a semantic type
    ///
    /// Unrecognized tags fall back to `String`. New tags appear as the API
    /// evolves, and downstream consumers cannot handle a field without a type.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "datetime" => Self::DateTime,
            "bool" => Self::Boolean,
            "string" | "enumeration" | "phone_number" | "date" | "json"
            | "object_coordinates" | "number" => Self::String,
            _ => Self::String,
        }
    }

    /// JSON Schema fragment for this type (always nullable)
    pub fn json_schema(self) -> JsonValue {
        match self {
            Self::String => json!({"type": ["null", "string"]}),
            Self::DateTime => json!({"type": ["null", "string"], "format": "date-time"}),
            Self::Boolean => json!({"type": ["null", "boolean"]}),
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::DateTime => write!(f, "datetime"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// A named, typed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Field name
    pub name: String,
    /// Semantic type
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
}

impl Property {
    /// Create a property
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
        }
    }

    /// Create a string property
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::String)
    }

    /// Create a datetime property
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::DateTime)
    }

    /// Create a boolean property
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::Boolean)
    }
}

/// One entry of a properties metadata response
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMetadata {
    /// Field name
    pub name: String,
    /// API type tag; anything but a string is treated as unmapped
    #[serde(rename = "type", default)]
    pub field_type: Option<JsonValue>,
    /// Soft-delete flag, read by truthiness
    #[serde(default)]
    pub deleted: Option<JsonValue>,
}

impl FieldMetadata {
    /// Soft-deleted fields are excluded from the schema
    pub fn is_deleted(&self) -> bool {
        self.deleted.as_ref().is_some_and(is_truthy)
    }

    /// The field as a schema property
    pub fn to_property(&self) -> Property {
        let semantic_type = self
            .field_type
            .as_ref()
            .and_then(JsonValue::as_str)
            .map_or(SemanticType::String, SemanticType::from_tag);
        Property::new(&self.name, semantic_type)
    }
}

/// Ordered set of typed fields
///
/// Names are unique: adding a field whose name already exists is ignored, so
/// the first definition wins.
#[derive(Debug, Clone, Default)]
pub struct SchemaDefinition {
    properties: Vec<Property>,
    datetime_fields: OnceLock<Vec<String>>,
}

impl PartialEq for SchemaDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
    }
}

impl SchemaDefinition {
    /// Create a schema from a list of properties (duplicates dropped)
    pub fn new(properties: impl IntoIterator<Item = Property>) -> Self {
        let mut schema = Self::default();
        schema.extend(properties);
        schema
    }

    /// Add a property; returns `false` if the name was already present
    pub fn push(&mut self, property: Property) -> bool {
        if self.contains(&property.name) {
            return false;
        }
        self.properties.push(property);
        self.datetime_fields = OnceLock::new();
        true
    }

    /// Add several properties, first occurrence wins
    pub fn extend(&mut self, properties: impl IntoIterator<Item = Property>) {
        for property in properties {
            self.push(property);
        }
    }

    /// Properties in declaration order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Look up a property by name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Check whether a field is defined
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Semantic type of a field
    pub fn type_of(&self, name: &str) -> Option<SemanticType> {
        self.get(name).map(|p| p.semantic_type)
    }

    /// Field names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Names of datetime fields, computed once
    pub fn datetime_fields(&self) -> &[String] {
        self.datetime_fields.get_or_init(|| {
            self.properties
                .iter()
                .filter(|p| p.semantic_type == SemanticType::DateTime)
                .map(|p| p.name.clone())
                .collect()
        })
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> JsonValue {
        let properties: JsonObject = self
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.semantic_type.json_schema()))
            .collect();
        json!({"type": "object", "properties": properties})
    }

    /// Coerce a record's values to their declared types
    ///
    /// - string fields: numbers become their exact JSON text
    /// - datetime fields: epoch milliseconds (number or digit string) become
    ///   RFC 3339
    /// - boolean fields: `"true"` / `"false"` become booleans
    ///
    /// Values that already fit, nulls and undeclared fields are left alone.
    pub fn conform(&self, mut record: Record) -> Record {
        for (name, value) in &mut record {
            if let Some(semantic_type) = self.type_of(name) {
                conform_value(semantic_type, value);
            }
        }
        record
    }
}

fn conform_value(semantic_type: SemanticType, value: &mut JsonValue) {
    let replacement = match (semantic_type, &*value) {
        (SemanticType::String, JsonValue::Number(n)) => Some(JsonValue::String(n.to_string())),
        (SemanticType::DateTime, JsonValue::Number(n)) => n.as_i64().and_then(epoch_millis_to_rfc3339),
        (SemanticType::DateTime, JsonValue::String(s))
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) =>
        {
            s.parse::<i64>().ok().and_then(epoch_millis_to_rfc3339)
        }
        (SemanticType::Boolean, JsonValue::String(s)) => match s.as_str() {
            "true" => Some(JsonValue::Bool(true)),
            "false" => Some(JsonValue::Bool(false)),
            _ => None,
        },
        _ => None,
    };

    if let Some(replacement) = replacement {
        *value = replacement;
    }
}

fn epoch_millis_to_rfc3339(millis: i64) -> Option<JsonValue> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
}
