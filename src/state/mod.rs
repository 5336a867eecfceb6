//! State management module
//!
//! Handles bookmarks, progress markers and their finalization. State is
//! persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `TapState` - the bookmark tree, one entry per stream with optional partitions
//! - `StateTracker` - every bookmark mutation: signposts, increments, finalization
//! - `StateManager` - file-based state persistence
//!
//! # Bookmark lifecycle
//!
//! While a stream syncs, processed records move the progress markers forward.
//! When the stream (or partition) completes, [`finalize_bookmark`] promotes
//! the markers to `replication_key` / `replication_key_value`, clamped to the
//! signpost taken at sync start, and strips the working values. A stream that
//! fails keeps its markers unpromoted.

mod manager;
mod tracker;
mod types;

pub use manager::StateManager;
pub use tracker::StateTracker;
pub use types::{
    compare_replication_values, finalize_bookmark, parse_datetime, Bookmark, PartitionEntry,
    ProgressMarkers, StreamState, TapState, PROGRESS_MARKER_NOTE,
};
