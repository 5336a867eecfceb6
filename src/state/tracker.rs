//! Bookmark tracking and finalization

use super::types::{
    compare_replication_values, finalize_bookmark, Bookmark, ProgressMarkers, TapState,
};
use crate::error::{Error, Result};
use crate::stream::StreamDescriptor;
use crate::types::{Context, JsonValue, Record};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Owns the tap state and applies every bookmark mutation
///
/// A tracker built with [`StateTracker::uninitialized`] models a run that
/// was started without a state container; every write then fails with
/// [`Error::StateNotInitialized`].
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    state: Option<TapState>,
}

impl StateTracker {
    /// Track an existing (possibly empty) state
    pub fn new(state: TapState) -> Self {
        Self { state: Some(state) }
    }

    /// A tracker with no state container
    pub fn uninitialized() -> Self {
        Self { state: None }
    }

    /// Check if a state container is present
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// The current state
    pub fn state(&self) -> Option<&TapState> {
        self.state.as_ref()
    }

    /// Take the state out of the tracker
    pub fn into_state(self) -> Option<TapState> {
        self.state
    }

    /// Bookmark for a stream/context, if present
    pub fn context_state(&self, stream: &str, context: Option<&Context>) -> Option<&Bookmark> {
        self.state.as_ref()?.stream(stream)?.bookmark(context)
    }

    /// Writable bookmark for a stream/context, created if missing
    pub fn context_state_mut(
        &mut self,
        stream: &str,
        context: Option<&Context>,
    ) -> Result<&mut Bookmark> {
        let state = self.state.as_mut().ok_or(Error::StateNotInitialized)?;
        Ok(state.stream_mut(stream).bookmark_mut(context))
    }

    /// Record the sync-start ceiling for a stream/context
    pub fn write_signpost(
        &mut self,
        stream: &str,
        context: Option<&Context>,
        value: JsonValue,
    ) -> Result<()> {
        self.context_state_mut(stream, context)?
            .replication_key_signpost = Some(value);
        Ok(())
    }

    /// Record where this sync starts from
    ///
    /// Uses the durable bookmark value when it was written for the same
    /// replication key, else `start_date`.
    pub fn write_starting_value(
        &mut self,
        stream: &str,
        context: Option<&Context>,
        replication_key: &str,
        start_date: Option<&JsonValue>,
    ) -> Result<()> {
        let bookmark = self.context_state_mut(stream, context)?;
        let from_bookmark = bookmark
            .replication_key_value
            .as_ref()
            .filter(|_| bookmark.replication_key.as_deref() == Some(replication_key));
        bookmark.starting_replication_value = from_bookmark.or(start_date).cloned();
        Ok(())
    }

    /// The starting value written by [`Self::write_starting_value`]
    pub fn starting_replication_value(
        &self,
        stream: &str,
        context: Option<&Context>,
    ) -> Option<&JsonValue> {
        self.context_state(stream, context)?
            .starting_replication_value
            .as_ref()
    }

    /// Advance the bookmark with a processed record
    ///
    /// Sorted streams write the durable value directly and reject a value
    /// lower than the current one. Unsorted streams only move the progress
    /// markers forward. Records without a value for the key are ignored.
    pub fn increment(
        &mut self,
        stream: &str,
        context: Option<&Context>,
        record: &Record,
        replication_key: &str,
        is_sorted: bool,
    ) -> Result<()> {
        let bookmark = self.context_state_mut(stream, context)?;
        let Some(new_value) = record.get(replication_key).filter(|v| !v.is_null()) else {
            debug!(stream, replication_key, "Record has no replication value");
            return Ok(());
        };

        if is_sorted {
            if let Some(old_value) = &bookmark.replication_key_value {
                if compare_replication_values(new_value, old_value) == Some(Ordering::Less) {
                    return Err(Error::InvalidStreamSort {
                        stream: stream.to_string(),
                        message: format!(
                            "{replication_key} value {new_value} is lower than previous value {old_value}"
                        ),
                    });
                }
            }
            bookmark.replication_key = Some(replication_key.to_string());
            bookmark.replication_key_value = Some(new_value.clone());
            return Ok(());
        }

        let markers = bookmark
            .progress_markers
            .get_or_insert_with(ProgressMarkers::with_note);
        let advance = match &markers.replication_key_value {
            None | Some(JsonValue::Null) => true,
            Some(old_value) => matches!(
                compare_replication_values(new_value, old_value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        };
        if advance {
            markers.replication_key = Some(replication_key.to_string());
            markers.replication_key_value = Some(new_value.clone());
        }
        Ok(())
    }

    /// Finalize one stream/context bookmark
    ///
    /// Returns progress markers that could not be promoted.
    pub fn finalize_context(
        &mut self,
        stream: &str,
        context: Option<&Context>,
    ) -> Result<Option<ProgressMarkers>> {
        let bookmark = self.context_state_mut(stream, context)?;
        let leftovers = finalize_bookmark(bookmark);
        if let Some(markers) = &leftovers {
            warn!(stream, ?markers, "Discarded unpromoted progress markers");
        }
        Ok(leftovers)
    }

    /// Finalize a whole stream tree
    ///
    /// Children are finalized first (recursively), then each declared
    /// partition of the stream, or its stream-level bookmark when it declares
    /// none. Returns the stream names in the order they were finalized.
    pub fn finalize_stream(&mut self, descriptor: &StreamDescriptor) -> Result<Vec<String>> {
        if self.state.is_none() {
            return Err(Error::StateNotInitialized);
        }

        let mut order = Vec::new();
        for child in &descriptor.children {
            order.extend(self.finalize_stream(child)?);
        }

        if descriptor.partitions.is_empty() {
            self.finalize_context(&descriptor.name, None)?;
        } else {
            for context in &descriptor.partitions {
                self.finalize_context(&descriptor.name, Some(context))?;
            }
        }

        order.push(descriptor.name.clone());
        Ok(order)
    }
}
