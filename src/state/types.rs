//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs:
//!
//! ```json
//! {"bookmarks": {"contacts": {"replication_key": "lastmodifieddate",
//!   "replication_key_value": "2024-01-15T00:00:00Z",
//!   "partitions": [{"context": {"list_id": 7}, "replication_key": "...",
//!   "replication_key_value": "..."}]}}}
//! ```

use crate::types::{Context, JsonObject, JsonValue};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Note attached to progress markers while a sync is running
pub const PROGRESS_MARKER_NOTE: &str = "Progress is not resumable if interrupted.";

/// Complete state for a tap run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapState {
    /// Per-stream state
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamState>,
}

impl TapState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn stream(&self, stream: &str) -> Option<&StreamState> {
        self.bookmarks.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.bookmarks.entry(stream.to_string()).or_default()
    }

    /// Durable replication value for a stream or partition
    pub fn replication_key_value(
        &self,
        stream: &str,
        context: Option<&Context>,
    ) -> Option<&JsonValue> {
        self.stream(stream)?
            .bookmark(context)?
            .replication_key_value
            .as_ref()
    }
}

/// State for a single stream: its own bookmark plus partition bookmarks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Stream-level bookmark
    #[serde(flatten)]
    pub bookmark: Bookmark,

    /// Per-partition bookmarks, in first-seen order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionEntry>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark for a context; `None` or an empty context addresses the
    /// stream-level bookmark
    pub fn bookmark(&self, context: Option<&Context>) -> Option<&Bookmark> {
        match context.filter(|ctx| !ctx.is_empty()) {
            None => Some(&self.bookmark),
            Some(ctx) => self
                .partitions
                .iter()
                .find(|entry| &entry.context == ctx)
                .map(|entry| &entry.bookmark),
        }
    }

    /// Mutable bookmark for a context, creating the partition entry if needed
    pub fn bookmark_mut(&mut self, context: Option<&Context>) -> &mut Bookmark {
        let Some(ctx) = context.filter(|ctx| !ctx.is_empty()) else {
            return &mut self.bookmark;
        };

        let index = match self.partitions.iter().position(|e| &e.context == ctx) {
            Some(index) => index,
            None => {
                self.partitions.push(PartitionEntry::new(ctx.clone()));
                self.partitions.len() - 1
            }
        };
        &mut self.partitions[index].bookmark
    }
}

/// A partition's context together with its bookmark
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionEntry {
    /// Partition key set
    pub context: Context,

    /// Partition bookmark
    #[serde(flatten)]
    pub bookmark: Bookmark,
}

impl PartitionEntry {
    /// Create an empty entry for a context
    pub fn new(context: Context) -> Self {
        Self {
            context,
            bookmark: Bookmark::default(),
        }
    }
}

/// Bookmark for one stream or partition
///
/// `replication_key` / `replication_key_value` are durable and only written
/// by finalization (or by sorted increments). The signpost, starting value
/// and progress markers are working values for the current sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<JsonValue>,

    /// Ceiling captured at sync start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_signpost: Option<JsonValue>,

    /// Floor the sync started from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_replication_value: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_markers: Option<ProgressMarkers>,

    /// Keys this crate does not manage, kept as loaded
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl Bookmark {
    /// Check whether the bookmark carries any working values
    pub fn has_working_values(&self) -> bool {
        self.replication_key_signpost.is_some()
            || self.starting_replication_value.is_some()
            || self.progress_markers.is_some()
    }
}

/// Mid-sync working values, not yet safe to treat as a high-water mark
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressMarkers {
    #[serde(rename = "Note", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_signpost: Option<JsonValue>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

impl ProgressMarkers {
    /// Fresh markers carrying the standard note
    pub fn with_note() -> Self {
        Self {
            note: Some(PROGRESS_MARKER_NOTE.to_string()),
            ..Self::default()
        }
    }

    /// Check whether nothing but (at most) the note is set
    pub fn is_empty(&self) -> bool {
        self.replication_key.is_none()
            && self.replication_key_value.is_none()
            && self.replication_key_signpost.is_none()
            && self.extra.is_empty()
    }
}

/// Promote a bookmark's progress markers to durable fields
///
/// The promoted value is clamped down to the signpost (from the markers, else
/// from the bookmark) so a bookmark never claims data newer than the point
/// the sync started reading from. The signpost, starting value, note and
/// markers are removed. Markers that were not promoted are returned.
///
/// Finalizing a marker-free bookmark leaves it unchanged.
pub fn finalize_bookmark(bookmark: &mut Bookmark) -> Option<ProgressMarkers> {
    let signpost = bookmark.replication_key_signpost.take();
    bookmark.starting_replication_value = None;

    let mut markers = bookmark.progress_markers.take()?;
    markers.note = None;
    let signpost = markers.replication_key_signpost.take().or(signpost);

    if let Some(replication_key) = markers.replication_key.take() {
        let mut value = markers.replication_key_value.take();
        if let (Some(ceiling), Some(current)) = (&signpost, &value) {
            if compare_replication_values(current, ceiling) == Some(Ordering::Greater) {
                value = Some(ceiling.clone());
            }
        }
        bookmark.replication_key = Some(replication_key);
        bookmark.replication_key_value = value;
    }

    (!markers.is_empty()).then_some(markers)
}

/// Order two replication values
///
/// Numbers compare numerically. Strings compare as datetimes (RFC 3339 or
/// `YYYY-MM-DD`) when both parse, lexicographically otherwise. Any other
/// combination is incomparable.
pub fn compare_replication_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (JsonValue::String(x), JsonValue::String(y)) => match (parse_datetime(x), parse_datetime(y)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.cmp(y)),
        },
        _ => None,
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date as UTC
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
