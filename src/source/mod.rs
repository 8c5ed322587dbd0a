//! Paginated playback-history source
//!
//! Wraps the external API behind the `PlaybackSource` trait: hand it a
//! cursor, get back one page of events plus whatever pagination metadata the
//! API cared to include. The wire types are deliberately lenient — cursor
//! metadata may be an object, an array, or absent, and the poller owns the
//! decision of what to do with it.

mod http;
mod types;

pub use http::{HttpPlaybackSource, PlaybackSource};
pub use types::{HistoryPage, PageCursors, PlayContext, PlayedItem, Track};
