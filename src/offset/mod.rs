//! Cursor state and offset storage
//!
//! The durable resume point for each partition lives here.
//!
//! # Overview
//!
//! - `PartitionKey` / `CursorState` - the resume point value types
//! - `initial_cursor` - bootstrap policy for the first run
//! - `OffsetStore` - read-only view of committed offsets, consumed at startup
//! - `FileOffsetStore` - file-backed store with atomic writes; the commit
//!   side belongs to the host delivering records downstream, never to the
//!   poller itself

mod store;
mod types;

pub use store::{FileOffsetStore, OffsetStore};
pub use types::{initial_cursor, CursorState, PartitionKey};
