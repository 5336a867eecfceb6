//! Tests for engine module

use super::*;
use crate::auth::{AuthConfig, ConfiguredAuthenticator};
use crate::client::ApiClient;
use crate::http::{HttpClient, RetryPolicy};
use crate::schema::Property;
use crate::state::{TapState, PROGRESS_MARKER_NOTE};
use crate::stream::StreamDescriptor;
use crate::types::context;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiClient {
    let auth = ConfiguredAuthenticator::new(AuthConfig::Bearer {
        token: "test-token".to_string(),
    });
    ApiClient::new(HttpClient::new().unwrap(), Arc::new(auth))
        .with_url_base(server.uri())
        .with_retry(RetryPolicy::exponential(Duration::from_millis(1), 3))
}

fn engine() -> SyncEngine {
    SyncEngine::new(StateTracker::new(TapState::new()))
}

fn lists_descriptor() -> StreamDescriptor {
    StreamDescriptor::new("lists", "contacts/v1/lists")
        .records_path("$.lists[*]")
        .property(Property::datetime("updatedAt"))
        .primary_keys(["listId", "updatedAt"])
        .replication_key("updatedAt")
        .page_size(250)
}

fn record_streams(messages: &[Message]) -> Vec<&str> {
    messages
        .iter()
        .filter(|m| m.is_record())
        .filter_map(Message::stream)
        .collect()
}

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_message_record_json_line() {
    let record = json!({"id": 1}).as_object().cloned().unwrap();
    let msg = Message::record("users", record);
    assert!(msg.is_record());
    assert!(!msg.is_state());
    assert_eq!(msg.stream(), Some("users"));

    let line: serde_json::Value = serde_json::from_str(&msg.to_json_line().unwrap()).unwrap();
    assert_eq!(line["type"], json!("RECORD"));
    assert_eq!(line["record"], json!({"id": 1}));
    assert!(line["time_extracted"].is_string());
}

#[test]
fn test_message_schema_and_state_json() {
    let msg = Message::Schema {
        stream: "deals_pipelines".to_string(),
        schema: json!({"type": "object"}),
        key_properties: vec!["pipelineId".to_string()],
        bookmark_properties: Vec::new(),
    };
    assert!(msg.is_schema());
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["type"], json!("SCHEMA"));
    assert!(value.get("bookmark_properties").is_none());

    let msg = Message::state(TapState::new());
    assert!(msg.is_state());
    assert_eq!(msg.stream(), None);
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({"type": "STATE", "value": {"bookmarks": {}}})
    );
}

#[test]
fn test_vec_sink_keeps_emit_order() {
    let mut sink: Vec<Message> = Vec::new();
    let record = json!({"id": 1}).as_object().cloned().unwrap();
    sink.emit(Message::record("users", record)).unwrap();
    sink.emit(Message::state(TapState::new())).unwrap();

    assert_eq!(sink.len(), 2);
    assert!(sink[0].is_record());
    assert!(sink[1].is_state());
}

// ============================================================================
// SyncConfig / SyncStats Tests
// ============================================================================

#[test]
fn test_sync_config_builder() {
    let config = SyncConfig::default();
    assert!(config.start_date.is_none());
    assert!(!config.fail_fast);

    let config = SyncConfig::new()
        .with_start_date("2024-01-01T00:00:00Z")
        .with_fail_fast(true);
    assert_eq!(config.start_date, Some(json!("2024-01-01T00:00:00Z")));
    assert!(config.fail_fast);
}

#[test]
fn test_sync_stats_counters() {
    let mut stats = SyncStats::new();
    stats.add_records(10);
    stats.add_records(5);
    stats.add_page();
    stats.add_stream();
    stats.add_partition();
    stats.add_error();
    stats.set_duration(42);

    assert_eq!(stats.records_synced, 15);
    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.streams_synced, 1);
    assert_eq!(stats.partitions_synced, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.duration_ms, 42);
}

#[test]
fn test_stream_failure_display() {
    let failure = StreamFailure {
        stream: "contacts".to_string(),
        page: 3,
        token: Some(crate::pagination::PageToken::single("vidOffset", json!(200))),
        error: Error::Timeout { timeout_ms: 10 },
    };
    assert_eq!(
        failure.to_string(),
        r#"stream 'contacts' failed on page 3 (token {"vidOffset":200}): Request timeout after 10ms"#
    );
}

// ============================================================================
// Sync Tests
// ============================================================================

#[tokio::test]
async fn test_uninitialized_state_is_fatal_before_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lists": []})))
        .expect(0)
        .mount(&server)
        .await;

    let streams = vec![RestStream::new(lists_descriptor(), api(&server))];
    let mut engine = SyncEngine::new(StateTracker::uninitialized());
    let mut messages = Vec::new();

    let err = engine.sync_all(&streams, &mut messages).await.unwrap_err();
    assert!(matches!(err, Error::StateNotInitialized));
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_incremental_stream_finalizes_bookmark() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/contacts/v1/lists"))
        .and(query_param("count", "250"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [
                {"listId": 1, "updatedAt": 1_700_000_000_000_i64},
                {"listId": 2, "updatedAt": 1_600_000_000_000_i64}
            ],
            "has-more": true,
            "offset": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/contacts/v1/lists"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [{"listId": 3, "updatedAt": 1_650_000_000_000_i64}],
            "has-more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let streams = vec![RestStream::new(lists_descriptor(), api(&server))];
    let mut engine = engine().with_config(SyncConfig::new().with_start_date("2020-01-01T00:00:00Z"));
    let mut messages = Vec::new();

    let report = engine.sync_all(&streams, &mut messages).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.stats.records_synced, 3);
    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(report.stats.streams_synced, 1);

    assert!(messages.first().unwrap().is_schema());
    assert!(messages.last().unwrap().is_state());
    assert_eq!(record_streams(&messages), vec!["lists"; 3]);

    let state = engine.tracker().state().unwrap();
    assert_eq!(
        serde_json::to_value(state).unwrap(),
        json!({
            "bookmarks": {
                "lists": {
                    "replication_key": "updatedAt",
                    "replication_key_value": "2023-11-14T22:13:20.000Z"
                }
            }
        })
    );
}

#[tokio::test]
async fn test_child_streams_follow_each_parent_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/contacts/v1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [{"listId": 1}, {"name": "no id"}, {"listId": 2}],
            "has-more": false
        })))
        .mount(&server)
        .await;

    for (list_id, vid) in [(1, 10), (2, 20)] {
        Mock::given(method("GET"))
            .and(path(format!("/contacts/v1/lists/{list_id}/contacts/all")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contacts": [{"vid": vid, "addedAt": 1_700_000_000_000_i64}],
                "has-more": false
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let child = StreamDescriptor::new("contact_list_data", "/contacts/v1/lists/{list_id}/contacts/all")
        .records_path("$.contacts[*]")
        .property(Property::datetime("addedAt"))
        .replication_key("addedAt");
    let parent = StreamDescriptor::new("contact_lists", "contacts/v1/lists")
        .records_path("$.lists[*]")
        .child(child)
        .child_context_key("list_id", "listId");

    let streams = vec![RestStream::new(parent, api(&server))];
    let mut engine = engine();
    let mut messages = Vec::new();

    let report = engine.sync_all(&streams, &mut messages).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.stats.partitions_synced, 2);

    let schemas: Vec<_> = messages
        .iter()
        .filter(|m| m.is_schema())
        .filter_map(Message::stream)
        .collect();
    assert_eq!(schemas, vec!["contact_lists", "contact_list_data"]);
    assert_eq!(
        record_streams(&messages),
        vec![
            "contact_lists",
            "contact_list_data",
            "contact_lists",
            "contact_lists",
            "contact_list_data"
        ]
    );

    let state = engine.tracker().state().unwrap();
    let child_state = state.stream("contact_list_data").unwrap();
    assert_eq!(child_state.partitions.len(), 2);
    for entry in &child_state.partitions {
        assert!(!entry.bookmark.has_working_values());
        assert_eq!(
            entry.bookmark.replication_key_value,
            Some(json!("2023-11-14T22:13:20.000Z"))
        );
    }
    assert_eq!(
        state.replication_key_value("contact_list_data", Some(&context([("list_id", 2)]))),
        Some(&json!("2023-11-14T22:13:20.000Z"))
    );
}

#[tokio::test]
async fn test_declared_partitions_each_finalized() {
    let server = MockServer::start().await;

    for list_id in [7, 8] {
        Mock::given(method("GET"))
            .and(path(format!("/contacts/v1/lists/{list_id}/contacts/all")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contacts": [{"vid": list_id, "addedAt": "2024-03-01T00:00:00Z"}],
                "has-more": false
            })))
            .mount(&server)
            .await;
    }

    let descriptor = StreamDescriptor::new("contact_list_data", "/contacts/v1/lists/{list_id}/contacts/all")
        .records_path("$.contacts[*]")
        .property(Property::datetime("addedAt"))
        .replication_key("addedAt")
        .partition(context([("list_id", 7)]))
        .partition(context([("list_id", 8)]));

    let streams = vec![RestStream::new(descriptor, api(&server))];
    let mut engine = engine();
    let mut messages = Vec::new();

    let report = engine.sync_all(&streams, &mut messages).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.stats.partitions_synced, 2);

    let Some(Message::State { value }) = messages.last() else {
        panic!("Expected a trailing state message");
    };
    let stream_state = value.stream("contact_list_data").unwrap();
    assert_eq!(stream_state.partitions.len(), 2);
    assert!(stream_state
        .partitions
        .iter()
        .all(|p| p.bookmark.replication_key_value == Some(json!("2024-03-01T00:00:00Z"))));
}

#[tokio::test]
async fn test_failing_stream_does_not_stop_the_next() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/engagements/v1/engagements/paged"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 1}],
            "has-more": true,
            "offset": 5
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/engagements/v1/engagements/paged"))
        .and(query_param("offset", "5"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calling/v1/dispositions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "x"}])))
        .mount(&server)
        .await;

    let streams = vec![
        RestStream::new(
            StreamDescriptor::new("engagements", "engagements/v1/engagements/paged")
                .records_path("$.results[*]"),
            api(&server),
        ),
        RestStream::new(
            StreamDescriptor::new("dispositions", "calling/v1/dispositions").single_page(),
            api(&server),
        ),
    ];
    let mut engine = engine();
    let mut messages = Vec::new();

    let report = engine.sync_all(&streams, &mut messages).await.unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);

    let failure = &report.failures[0];
    assert_eq!(failure.stream, "engagements");
    assert_eq!(failure.page, 2);
    assert_eq!(
        failure.token,
        Some(crate::pagination::PageToken::single("offset", json!(5)))
    );
    assert!(matches!(failure.error, Error::FatalApi { status: 403, .. }));

    assert_eq!(report.stats.errors, 1);
    assert_eq!(report.stats.streams_synced, 1);
    assert_eq!(record_streams(&messages), vec!["engagements", "dispositions"]);
}

#[tokio::test]
async fn test_fail_fast_stops_after_first_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/integrations/v1/me"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calling/v1/dispositions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let streams = vec![
        RestStream::new(
            StreamDescriptor::new("account", "integrations/v1/me")
                .records_path("$")
                .single_page(),
            api(&server),
        ),
        RestStream::new(
            StreamDescriptor::new("dispositions", "calling/v1/dispositions").single_page(),
            api(&server),
        ),
    ];
    let mut engine = engine().with_config(SyncConfig::new().with_fail_fast(true));
    let mut messages = Vec::new();

    let report = engine.sync_all(&streams, &mut messages).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].page, 1);
    assert!(report.failures[0].token.is_none());
    assert_eq!(report.stats.streams_synced, 0);
}

#[tokio::test]
async fn test_sorted_stream_rejects_out_of_order_values() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/contacts/v1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [
                {"listId": 1, "updatedAt": "2024-02-01T00:00:00Z"},
                {"listId": 2, "updatedAt": "2024-01-01T00:00:00Z"}
            ],
            "has-more": false
        })))
        .mount(&server)
        .await;

    let streams = vec![RestStream::new(lists_descriptor().sorted(true), api(&server))];
    let mut engine = engine();
    let mut messages = Vec::new();

    let report = engine.sync_all(&streams, &mut messages).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        Error::InvalidStreamSort { .. }
    ));
    assert!(!messages.iter().any(Message::is_state));
}

#[tokio::test]
async fn test_interrupted_unsorted_stream_keeps_progress_markers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/contacts/v1/lists"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [{"listId": 1, "updatedAt": "2024-02-01T00:00:00Z"}],
            "has-more": true,
            "offset": 1
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/contacts/v1/lists"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let streams = vec![RestStream::new(lists_descriptor(), api(&server))];
    let mut engine = engine();
    let mut messages = Vec::new();

    let report = engine.sync_all(&streams, &mut messages).await.unwrap();
    assert_eq!(report.failures.len(), 1);

    let bookmark = engine.tracker().context_state("lists", None).unwrap();
    assert!(bookmark.replication_key_value.is_none());
    assert!(bookmark.replication_key_signpost.is_some());
    let markers = bookmark.progress_markers.as_ref().unwrap();
    assert_eq!(markers.note.as_deref(), Some(PROGRESS_MARKER_NOTE));
    assert_eq!(
        markers.replication_key_value,
        Some(json!("2024-02-01T00:00:00Z"))
    );
}
