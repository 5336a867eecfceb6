//! Schema module
//!
//! Typed field schemas derived from a remote metadata endpoint.
//!
//! # Features
//!
//! - **Closed type table**: API type tags map onto [`SemanticType`] with a
//!   string catch-all
//! - **Base + discovered fields**: static base fields first, then metadata
//!   fields in response order, first occurrence wins
//! - **Record conformance**: values coerced to their declared types

mod resolver;
mod types;

pub use resolver::{parse_field_metadata, resolve_schema};
pub use types::{FieldMetadata, Property, SchemaDefinition, SemanticType};

#[cfg(test)]
mod tests;
