// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # hubspot-tap
//!
//! Incremental extraction engine for the HubSpot REST API.
//!
//! ## Features
//!
//! - **Paged Extraction**: `count` / `has-more` / `offset` / `vid-offset` paging
//!   with loop detection
//! - **Retry**: exponential backoff (factor 3, 8 attempts) over throttling,
//!   server and transport faults
//! - **Schema Discovery**: field lists fetched once per stream from the
//!   properties endpoint
//! - **Incremental State**: bookmarks, progress markers and signposts with
//!   Singer-style finalization
//! - **Parent/Child Streams**: children synced per parent record under their
//!   own partition bookmarks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hubspot_tap::{catalog, SyncConfig, SyncEngine, StateManager, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> hubspot_tap::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let streams = catalog::streams_from_config(&config)?;
//!
//!     let state = StateManager::from_file("state.json")?;
//!     let mut sync_config = SyncConfig::new();
//!     if let Some(start_date) = &config.start_date {
//!         sync_config = sync_config.with_start_date(start_date.as_str());
//!     }
//!     let mut engine = SyncEngine::new(state.tracker().await).with_config(sync_config);
//!
//!     let mut messages = Vec::new();
//!     let report = engine.sync_all(&streams, &mut messages).await?;
//!     state.commit(engine.into_tracker()).await?;
//!
//!     for failure in &report.failures {
//!         eprintln!("{failure}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          SyncEngine                             │
//! │   schema → pages → records → increment → children → finalize    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Paginate    │  Schema   │    State    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Bearer   │ GET       │ has-more      │ Resolver  │ Bookmarks   │
//! │ OAuth2   │ Retry     │ offset        │ Conform   │ Markers     │
//! │ API Key  │ Rate Limit│ vidOffset     │           │ Signposts   │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Path template interpolation
pub mod template;

/// Tap configuration
pub mod config;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Authenticated API access
pub mod client;

/// Pagination strategies
pub mod pagination;

/// Record parsers
pub mod decode;

/// Schema resolution and record conformance
pub mod schema;

/// Bookmark state and finalization
pub mod state;

/// Stream descriptors and the request loop
pub mod stream;

/// Main execution engine
pub mod engine;

/// Built-in HubSpot streams
pub mod catalog;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::ApiClient;
pub use config::TapConfig;
pub use engine::{Message, MessageSink, StreamFailure, SyncConfig, SyncEngine, SyncReport};
pub use state::{StateManager, StateTracker, TapState};
pub use stream::{RestStream, StreamDescriptor};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
