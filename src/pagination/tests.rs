//! Tests for pagination module

use super::*;
use serde_json::json;

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// PageToken Tests
// ============================================================================

#[test]
fn test_page_token_equality_is_deep() {
    let a = PageToken::single("offset", json!(120));
    let b = PageToken::single("offset", json!(120));
    let c = PageToken::single("offset", json!("120"));
    let d = PageToken::single("vidOffset", json!(120));

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);
}

#[test]
fn test_page_token_params_and_display() {
    let token = PageToken::single("vidOffset", json!(3301));
    assert_eq!(token.to_params(), params(&[("vidOffset", "3301")]));
    assert_eq!(token.to_string(), r#"{"vidOffset":3301}"#);
    assert_eq!(token.get("vidOffset"), Some(&json!(3301)));
}

#[test]
fn test_page_token_serde_transparent() {
    let token: PageToken = serde_json::from_value(json!({"offset": "abc"})).unwrap();
    assert_eq!(token, PageToken::single("offset", "abc"));
    assert_eq!(serde_json::to_value(&token).unwrap(), json!({"offset": "abc"}));
}

// ============================================================================
// HasMorePaginator Tests
// ============================================================================

#[test]
fn test_first_page_params() {
    let paginator = HasMorePaginator::new(250);
    assert_eq!(paginator.url_params(None, None), params(&[("count", "250")]));
}

#[test]
fn test_page_size_always_injected_with_token() {
    let paginator = HasMorePaginator::new(100);
    let token = PageToken::single("offset", json!(200));
    assert_eq!(
        paginator.url_params(None, Some(&token)),
        params(&[("count", "100"), ("offset", "200")])
    );
}

#[test]
fn test_custom_page_size_param() {
    let paginator = HasMorePaginator::new(50).with_page_size_param("limit");
    assert_eq!(paginator.url_params(None, None), params(&[("limit", "50")]));
}

#[test]
fn test_has_more_prefers_offset() {
    let paginator = HasMorePaginator::default();
    let body = json!({"has-more": true, "offset": 40, "vid-offset": 999});
    assert_eq!(
        paginator.next_page_token(&body, None),
        Some(PageToken::single("offset", json!(40)))
    );
}

#[test]
fn test_has_more_falls_back_to_vid_offset() {
    let paginator = HasMorePaginator::default();
    let body = json!({"has-more": true, "vid-offset": 3301});
    assert_eq!(
        paginator.next_page_token(&body, None),
        Some(PageToken::single("vidOffset", json!(3301)))
    );

    // A zero offset is treated as absent
    let body = json!({"has-more": true, "offset": 0, "vid-offset": 12});
    assert_eq!(
        paginator.next_page_token(&body, None),
        Some(PageToken::single("vidOffset", json!(12)))
    );
}

#[test]
fn test_has_more_false_or_absent_terminates() {
    let paginator = HasMorePaginator::default();
    assert!(paginator
        .next_page_token(&json!({"has-more": false, "offset": 40}), None)
        .is_none());
    assert!(paginator.next_page_token(&json!({"offset": 40}), None).is_none());
    assert!(paginator.next_page_token(&json!([]), None).is_none());
}

#[test]
fn test_has_more_without_continuation_terminates() {
    let paginator = HasMorePaginator::default();
    assert!(paginator
        .next_page_token(&json!({"has-more": true}), None)
        .is_none());
}

#[test]
fn test_token_can_repeat_previous() {
    // Loop detection lives in the request loop; the paginator reports what
    // the server said.
    let paginator = HasMorePaginator::default();
    let previous = PageToken::single("offset", json!(10));
    let next = paginator.next_page_token(&json!({"has-more": true, "offset": 10}), Some(&previous));
    assert_eq!(next.as_ref(), Some(&previous));
}

// ============================================================================
// SinglePagePaginator Tests
// ============================================================================

#[test]
fn test_single_page() {
    let paginator = SinglePagePaginator;
    assert!(paginator.url_params(None, None).is_empty());
    assert!(paginator
        .next_page_token(&json!({"has-more": true, "offset": 1}), None)
        .is_none());
}
