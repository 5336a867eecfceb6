//! Schema tests

use super::*;
use crate::auth::{AuthConfig, ConfiguredAuthenticator};
use crate::client::ApiClient;
use crate::error::Error;
use crate::http::{HttpClient, RetryPolicy};
use crate::types::Record;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiClient {
    let auth = ConfiguredAuthenticator::new(AuthConfig::Bearer {
        token: "pat-na1-123".to_string(),
    });
    ApiClient::new(HttpClient::new().unwrap(), Arc::new(auth))
        .with_url_base(server.uri())
        .with_retry(RetryPolicy::exponential(Duration::from_millis(1), 3))
}

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

// ============================================================================
// Type Table Tests
// ============================================================================

#[test_case("string", SemanticType::String)]
#[test_case("enumeration", SemanticType::String)]
#[test_case("phone_number", SemanticType::String)]
#[test_case("date", SemanticType::String)]
#[test_case("json", SemanticType::String)]
#[test_case("object_coordinates", SemanticType::String)]
#[test_case("number", SemanticType::String)]
#[test_case("datetime", SemanticType::DateTime)]
#[test_case("bool", SemanticType::Boolean)]
#[test_case("currency_number", SemanticType::String ; "unknown tag")]
#[test_case("", SemanticType::String ; "empty tag")]
fn test_type_table(tag: &str, expected: SemanticType) {
    assert_eq!(SemanticType::from_tag(tag), expected);
}

#[test]
fn test_missing_type_tag_is_string() {
    let field: FieldMetadata = serde_json::from_value(json!({"name": "x"})).unwrap();
    assert_eq!(field.to_property(), Property::string("x"));
    assert!(!field.is_deleted());
}

#[test]
fn test_non_string_type_tag_is_string() {
    let fields = parse_field_metadata(json!([
        {"name": "a", "type": 7},
        {"name": "b", "type": null},
        {"name": "c", "type": ["datetime"]}
    ]))
    .unwrap();

    let properties: Vec<Property> = fields.iter().map(FieldMetadata::to_property).collect();
    assert_eq!(
        properties,
        vec![Property::string("a"), Property::string("b"), Property::string("c")]
    );
}

#[test_case(json!(null), false ; "null")]
#[test_case(json!(false), false ; "false")]
#[test_case(json!(0), false ; "zero")]
#[test_case(json!(""), false ; "empty string")]
#[test_case(json!(true), true ; "true")]
#[test_case(json!(1), true ; "one")]
#[test_case(json!("yes"), true ; "non-empty string")]
fn test_deleted_flag_by_truthiness(deleted: serde_json::Value, expected: bool) {
    let fields =
        parse_field_metadata(json!([{"name": "a", "type": "string", "deleted": deleted}]))
            .unwrap();
    assert_eq!(fields[0].is_deleted(), expected);
}

// ============================================================================
// SchemaDefinition Tests
// ============================================================================

#[test]
fn test_first_occurrence_wins() {
    let mut schema = SchemaDefinition::new([Property::datetime("lastmodifieddate")]);
    assert!(!schema.push(Property::string("lastmodifieddate")));
    assert!(schema.push(Property::string("email")));

    assert_eq!(schema.len(), 2);
    assert_eq!(
        schema.type_of("lastmodifieddate"),
        Some(SemanticType::DateTime)
    );
    assert_eq!(
        schema.names().collect::<Vec<_>>(),
        vec!["lastmodifieddate", "email"]
    );
}

#[test]
fn test_datetime_fields_track_pushes() {
    let mut schema = SchemaDefinition::new([
        Property::string("vid"),
        Property::datetime("addedAt"),
    ]);
    assert_eq!(schema.datetime_fields(), ["addedAt".to_string()]);

    schema.push(Property::datetime("createdate"));
    assert_eq!(
        schema.datetime_fields(),
        ["addedAt".to_string(), "createdate".to_string()]
    );
}

#[test]
fn test_to_json_schema() {
    let schema = SchemaDefinition::new([
        Property::string("vid"),
        Property::datetime("addedAt"),
        Property::boolean("is-contact"),
    ]);

    assert_eq!(
        schema.to_json_schema(),
        json!({
            "type": "object",
            "properties": {
                "vid": {"type": ["null", "string"]},
                "addedAt": {"type": ["null", "string"], "format": "date-time"},
                "is-contact": {"type": ["null", "boolean"]}
            }
        })
    );
}

#[test]
fn test_conform_record() {
    let schema = SchemaDefinition::new([
        Property::string("vid"),
        Property::string("amount"),
        Property::datetime("addedAt"),
        Property::datetime("updatedAt"),
        Property::boolean("is-contact"),
        Property::boolean("archived"),
    ]);

    let conformed = schema.conform(record(json!({
        "vid": 3301,
        "amount": 12.5,
        "addedAt": 1_700_000_000_000_i64,
        "updatedAt": "1700000000000",
        "is-contact": "true",
        "archived": false,
        "extra": {"kept": 1}
    })));

    assert_eq!(
        serde_json::Value::Object(conformed),
        json!({
            "vid": "3301",
            "amount": "12.5",
            "addedAt": "2023-11-14T22:13:20.000Z",
            "updatedAt": "2023-11-14T22:13:20.000Z",
            "is-contact": true,
            "archived": false,
            "extra": {"kept": 1}
        })
    );
}

#[test]
fn test_conform_leaves_nulls_and_rfc3339() {
    let schema = SchemaDefinition::new([
        Property::datetime("closedate"),
        Property::boolean("flag"),
    ]);
    let input = record(json!({
        "closedate": "2024-01-15T00:00:00Z",
        "flag": null
    }));
    assert_eq!(schema.conform(input.clone()), input);
}

#[test]
fn test_conform_keeps_exact_number_text() {
    let schema = SchemaDefinition::new([
        Property::string("big"),
        Property::string("dec"),
        Property::string("exp"),
    ]);
    let input: Record =
        serde_json::from_str(r#"{"big": 12345678901234567890123, "dec": 1.10, "exp": 9007199254740993}"#)
            .unwrap();

    let out = schema.conform(input);
    assert_eq!(out["big"], json!("12345678901234567890123"));
    assert_eq!(out["dec"], json!("1.10"));
    assert_eq!(out["exp"], json!("9007199254740993"));
}

// ============================================================================
// Resolver Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_excludes_deleted_and_maps_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/properties/v1/contacts/properties"))
        .and(header("Authorization", "Bearer pat-na1-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "a", "type": "string"},
            {"name": "b", "type": "number"},
            {"name": "c", "type": "bool", "deleted": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let schema = resolve_schema(
        &api(&server),
        &[Property::string("vid")],
        Some("properties/v1/contacts/properties"),
    )
    .await
    .unwrap();

    assert_eq!(
        schema.properties(),
        [
            Property::string("vid"),
            Property::string("a"),
            Property::string("b"),
        ]
    );
    assert!(!schema.contains("c"));
}

#[tokio::test]
async fn test_resolve_tolerates_loose_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/props"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "email", "type": "string", "deleted": null},
            {"name": "score", "type": 7},
            {"name": "legacy", "type": "string", "deleted": 1}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let schema = resolve_schema(&api(&server), &[], Some("/props"))
        .await
        .unwrap();

    assert_eq!(
        schema.properties(),
        [Property::string("email"), Property::string("score")]
    );
}

#[tokio::test]
async fn test_resolve_discovered_duplicate_of_base_field_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/props"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "createdate", "type": "string"},
            {"name": "hs_score", "type": "number"},
            {"name": "hs_score", "type": "bool"}
        ])))
        .mount(&server)
        .await;

    let schema = resolve_schema(
        &api(&server),
        &[Property::datetime("createdate")],
        Some("/props"),
    )
    .await
    .unwrap();

    assert_eq!(schema.type_of("createdate"), Some(SemanticType::DateTime));
    assert_eq!(schema.type_of("hs_score"), Some(SemanticType::String));
    assert_eq!(schema.len(), 2);
}

#[tokio::test]
async fn test_resolve_without_properties_path_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let base = [Property::string("listId"), Property::datetime("updatedAt")];
    let schema = resolve_schema(&api(&server), &base, None).await.unwrap();
    assert_eq!(schema.properties(), base);
}

#[tokio::test]
async fn test_resolve_fatal_status_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/props"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = resolve_schema(&api(&server), &[], Some("props"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FatalApi { status: 403, .. }));
}

#[tokio::test]
async fn test_resolve_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/props"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/props"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "a", "type": "datetime"}])))
        .mount(&server)
        .await;

    let schema = resolve_schema(&api(&server), &[], Some("props"))
        .await
        .unwrap();
    assert_eq!(schema.datetime_fields(), ["a".to_string()]);
}

#[test]
fn test_metadata_must_be_array() {
    let err = parse_field_metadata(json!({"results": []})).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains("an object"));
}
