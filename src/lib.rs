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
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Playfeed
//!
//! A source connector that incrementally pulls playback history from a
//! cursor-paginated API and republishes it, oldest-first, into a durable
//! partitioned log.
//!
//! ## Guarantees
//!
//! - **At-least-once delivery**: a crash between emit and commit re-emits the
//!   overlap on the next run; committed data is never lost or skipped.
//! - **Ordering**: each emitted batch is ordered oldest to newest, so a
//!   partial commit never leaves a gap behind a committed record.
//! - **Durable resume**: the poller resumes from the last *committed* cursor,
//!   bootstrapping from a lookback window on first run.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use playfeed::{FileOffsetStore, PlayfeedTask, Result, SourceTask};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let offsets = Arc::new(FileOffsetStore::open("offsets.json")?);
//!     let mut task = PlayfeedTask::new(offsets);
//!
//!     let mut config = HashMap::new();
//!     config.insert("topic".into(), "plays".into());
//!     config.insert("username".into(), "alice".into());
//!     config.insert("oauth.access.token".into(), "token".into());
//!     task.start(config).await?;
//!
//!     loop {
//!         for record in task.poll().await? {
//!             // deliver the record, then commit record.offset
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SourceTask (host boundary)                 │
//! │  start(config)    poll() → Vec<SourceRecord>    stop()          │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬────────────┬────────────┐
//! │   Auth   │   HTTP    │    Source     │   Offset   │   Poller   │
//! ├──────────┼───────────┼───────────────┼────────────┼────────────┤
//! │ Bearer   │ GET       │ fetch(cursor) │ load       │ wait       │
//! │ OAuth2   │ Retry     │ HistoryPage   │ bootstrap  │ fetch      │
//! │ refresh  │ Rate limit│ cursor scan   │ file store │ reorder    │
//! │          │ Backoff   │               │            │ transform  │
//! └──────────┴───────────┴───────────────┴────────────┴────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Add docs before 1.0 release

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication (bearer token, OAuth2 refresh)
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Paginated playback-history source
pub mod source;

/// Cursor state, bootstrap policy, and offset storage
pub mod offset;

/// Record transformation (foreign event → emitted record)
pub mod record;

/// The polling loop and its state machine
pub mod poller;

/// Connector configuration
pub mod config;

/// Source task (host framework boundary)
pub mod task;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ConnectorConfig;
pub use offset::{initial_cursor, CursorState, FileOffsetStore, OffsetStore, PartitionKey};
pub use poller::Poller;
pub use record::SourceRecord;
pub use source::{HistoryPage, PlaybackSource};
pub use task::{PlayfeedTask, SourceTask};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
