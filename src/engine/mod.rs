//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Drives streams, their children and the state tracker
//! - `SyncConfig` - Configuration for sync operations
//! - `Message` / `MessageSink` - Schema, record and state output
//!
//! Streams run one after another. Within a stream, each record is emitted,
//! counted against the bookmark, and then used to drive the stream's
//! children before the next record is looked at.

mod types;

pub use types::{Message, MessageSink, StreamFailure, SyncConfig, SyncReport, SyncStats};

use crate::error::{Error, Result};
use crate::pagination::PageToken;
use crate::schema::SemanticType;
use crate::state::StateTracker;
use crate::stream::RestStream;
use crate::types::{Context, JsonValue};
use chrono::{SecondsFormat, Utc};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::time::Instant;
use tracing::{debug, error, info};

type StreamResult<T> = std::result::Result<T, StreamFailure>;

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// Bookmark state
    tracker: StateTracker,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(tracker: StateTracker) -> Self {
        Self {
            tracker,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state tracker
    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Take the state tracker out of the engine
    pub fn into_tracker(self) -> StateTracker {
        self.tracker
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync every stream in order
    ///
    /// A failing stream is logged and recorded in the report; the remaining
    /// streams still run unless `fail_fast` is set. A missing state container
    /// is fatal before any request is made.
    pub async fn sync_all(
        &mut self,
        streams: &[RestStream],
        sink: &mut dyn MessageSink,
    ) -> Result<SyncReport> {
        if !self.tracker.is_initialized() {
            return Err(Error::StateNotInitialized);
        }

        let start = Instant::now();
        let mut failures = Vec::new();

        for stream in streams {
            if let Err(failure) = self.sync_stream(stream, sink).await {
                error!(
                    stream = %failure.stream,
                    page = failure.page,
                    token = ?failure.token.as_ref().map(ToString::to_string),
                    error = %failure.error,
                    "Stream sync failed"
                );
                self.stats.add_error();
                failures.push(failure);
                if self.config.fail_fast {
                    break;
                }
            }
        }

        self.stats.set_duration(start.elapsed().as_millis() as u64);

        Ok(SyncReport {
            stats: self.stats.clone(),
            failures,
        })
    }

    /// Sync one stream and its children, then finalize and emit its state
    pub async fn sync_stream(
        &mut self,
        stream: &RestStream,
        sink: &mut dyn MessageSink,
    ) -> StreamResult<()> {
        let start = Instant::now();
        let records_before = self.stats.records_synced;
        info!(stream = stream.name(), "Starting sync");

        for target in flatten(stream) {
            self.emit_schema(target, sink).await?;
        }

        let descriptor = stream.descriptor();
        if descriptor.partitions.is_empty() {
            self.sync_context(stream, None, sink).await?;
        } else {
            for context in &descriptor.partitions {
                self.sync_context(stream, Some(context), sink).await?;
                self.tracker
                    .finalize_context(stream.name(), Some(context))
                    .map_err(|e| failure(stream, 0, None, e))?;
                self.stats.add_partition();
            }
        }

        self.tracker
            .finalize_stream(descriptor)
            .map_err(|e| failure(stream, 0, None, e))?;
        let state = self
            .tracker
            .state()
            .cloned()
            .ok_or_else(|| failure(stream, 0, None, Error::StateNotInitialized))?;
        sink.emit(Message::state(state))
            .map_err(|e| failure(stream, 0, None, e))?;

        self.stats.add_stream();
        info!(
            stream = stream.name(),
            records = self.stats.records_synced - records_before,
            duration_ms = start.elapsed().as_millis() as u64,
            "Completed sync"
        );
        Ok(())
    }

    async fn emit_schema(
        &self,
        stream: &RestStream,
        sink: &mut dyn MessageSink,
    ) -> StreamResult<()> {
        let schema = stream
            .schema()
            .await
            .map_err(|e| failure(stream, 1, None, e))?;
        let descriptor = stream.descriptor();

        sink.emit(Message::Schema {
            stream: descriptor.name.clone(),
            schema: schema.to_json_schema(),
            key_properties: descriptor.primary_keys.clone(),
            bookmark_properties: descriptor.replication_key.iter().cloned().collect(),
        })
        .map_err(|e| failure(stream, 0, None, e))
    }

    /// Sync all pages of one stream/context, recursing into children per
    /// record
    fn sync_context<'a>(
        &'a mut self,
        stream: &'a RestStream,
        context: Option<&'a Context>,
        sink: &'a mut dyn MessageSink,
    ) -> BoxFuture<'a, StreamResult<()>> {
        async move {
            let name = stream.name();
            let descriptor = stream.descriptor();

            if let Some(replication_key) = &descriptor.replication_key {
                self.prepare_bookmark(stream, context, replication_key)
                    .await
                    .map_err(|e| failure(stream, 1, None, e))?;
            }

            let mut pages = std::pin::pin!(stream.pages(context));
            let mut last_page = 0;
            let mut last_token: Option<PageToken> = None;

            while let Some(result) = pages.next().await {
                let page = result.map_err(|e| failure(stream, last_page + 1, last_token.clone(), e))?;
                self.stats.add_page();

                for record in &page.records {
                    sink.emit(Message::record(name, record.clone()))
                        .map_err(|e| failure(stream, page.number, page.token.clone(), e))?;
                    self.stats.add_records(1);

                    if let Some(replication_key) = &descriptor.replication_key {
                        self.tracker
                            .increment(name, context, record, replication_key, descriptor.is_sorted)
                            .map_err(|e| failure(stream, page.number, page.token.clone(), e))?;
                    }

                    for child in stream.children() {
                        let Some(child_context) = descriptor.child_context(record) else {
                            debug!(
                                stream = name,
                                child = child.name(),
                                "Record has no child context, skipping child"
                            );
                            continue;
                        };
                        self.sync_context(child, Some(&child_context), sink).await?;
                        self.tracker
                            .finalize_context(child.name(), Some(&child_context))
                            .map_err(|e| failure(child, 0, None, e))?;
                        self.stats.add_partition();
                    }
                }

                last_page = page.number;
                last_token = page.next_token;
            }

            Ok(())
        }
        .boxed()
    }

    /// Write the signpost and starting value before the first request
    async fn prepare_bookmark(
        &mut self,
        stream: &RestStream,
        context: Option<&Context>,
        replication_key: &str,
    ) -> Result<()> {
        let schema = stream.schema().await?;
        if schema.type_of(replication_key) == Some(SemanticType::DateTime) {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            self.tracker
                .write_signpost(stream.name(), context, JsonValue::String(now))?;
        }
        self.tracker.write_starting_value(
            stream.name(),
            context,
            replication_key,
            self.config.start_date.as_ref(),
        )
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = SyncStats::default();
    }
}

fn flatten(stream: &RestStream) -> Vec<&RestStream> {
    let mut out = vec![stream];
    for child in stream.children() {
        out.extend(flatten(child));
    }
    out
}

fn failure(stream: &RestStream, page: usize, token: Option<PageToken>, error: Error) -> StreamFailure {
    StreamFailure {
        stream: stream.name().to_string(),
        page,
        token,
        error,
    }
}

#[cfg(test)]
mod tests;
