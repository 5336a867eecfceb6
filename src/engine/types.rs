//! Engine types
//!
//! Messages emitted during sync, the sink that collects them, and the
//! configuration and reporting types of a run.

use crate::error::{Error, Result};
use crate::pagination::PageToken;
use crate::state::TapState;
use crate::types::{JsonValue, Record};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Stream schema, emitted before the stream's first record
    Schema {
        /// Stream name
        stream: String,
        /// JSON Schema of the stream
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key, if any
        #[serde(skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    /// A single record
    Record {
        /// Stream name
        stream: String,
        /// The conformed record
        record: Record,
        /// When the record's page was received
        time_extracted: DateTime<Utc>,
    },
    /// Finalized state after a stream completes
    State {
        /// The whole state tree
        value: TapState,
    },
}

impl Message {
    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Utc::now(),
        }
    }

    /// Create a state message
    pub fn state(value: TapState) -> Self {
        Self::State { value }
    }

    /// Stream the message belongs to (`None` for state)
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Serialize as a single JSON line
    pub fn to_json_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }
}

/// Destination for emitted messages
pub trait MessageSink: Send {
    /// Accept one message
    fn emit(&mut self, message: Message) -> Result<()>;
}

impl MessageSink for Vec<Message> {
    fn emit(&mut self, message: Message) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Starting replication value for contexts without a bookmark
    pub start_date: Option<JsonValue>,
    /// Stop at the first failing stream instead of continuing
    pub fail_fast: bool,
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start date
    #[must_use]
    pub fn with_start_date(mut self, start_date: impl Into<JsonValue>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    /// Set fail fast mode
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records synced, children included
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Streams that completed
    pub streams_synced: usize,
    /// Contexts (partitions and child contexts) that completed
    pub partitions_synced: usize,
    /// Streams that failed
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add a partition
    pub fn add_partition(&mut self) {
        self.partitions_synced += 1;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// A stream that failed during sync
#[derive(Debug)]
pub struct StreamFailure {
    /// Name of the stream (or child stream) that failed
    pub stream: String,
    /// Page number being fetched when the failure occurred
    pub page: usize,
    /// Token of the failing request (`None` on the first page)
    pub token: Option<PageToken>,
    /// The error
    pub error: Error,
}

impl std::fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.token {
            Some(token) => write!(
                f,
                "stream '{}' failed on page {} (token {token}): {}",
                self.stream, self.page, self.error
            ),
            None => write!(
                f,
                "stream '{}' failed on page {}: {}",
                self.stream, self.page, self.error
            ),
        }
    }
}

/// Outcome of [`SyncEngine::sync_all`](super::SyncEngine::sync_all)
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Run statistics
    pub stats: SyncStats,
    /// Streams that failed, in run order
    pub failures: Vec<StreamFailure>,
}

impl SyncReport {
    /// Check if every stream completed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
