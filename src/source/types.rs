//! Wire types for the playback-history API
//!
//! The API returns events newest-first with optional pagination cursors.
//! Deserialization is lenient where the API is ambiguous: `cursors` accepts
//! a single object or an array of them, cursor values accept strings or
//! numbers, and `played_at` accepts RFC 3339 or integer milliseconds.
//! Items stay raw JSON here; typed parsing happens per item during
//! transformation so one malformed event cannot poison a page.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use chrono::DateTime;
use serde::{Deserialize, Deserializer};

// ============================================================================
// Page
// ============================================================================

/// One page of playback history, as returned by the API.
///
/// Items arrive newest-first. Cursor metadata may be entirely absent (an
/// empty page usually carries none).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryPage {
    /// Raw play events, newest-first
    #[serde(default)]
    pub items: Vec<JsonValue>,

    /// Pagination cursor entries; object and array forms both accepted
    #[serde(default, deserialize_with = "de_cursor_entries")]
    pub cursors: Vec<PageCursors>,
}

impl HistoryPage {
    /// Check whether the page carries no events
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of events on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// One pagination cursor entry.
///
/// The API does not guarantee both directions are present; either side may
/// be null or missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageCursors {
    /// Cursor for events newer than this page
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub after: Option<String>,

    /// Cursor for events older than this page
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub before: Option<String>,
}

impl PageCursors {
    /// The `after` cursor as a millisecond timestamp.
    ///
    /// Returns `None` when the entry has no `after` value, and
    /// `Some(Err(MalformedCursor))` when it has one that does not parse.
    pub fn after_timestamp(&self) -> Option<Result<i64>> {
        self.after.as_ref().map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| Error::malformed_cursor(raw.as_str()))
        })
    }
}

// ============================================================================
// Play events
// ============================================================================

/// One playback event, typed.
///
/// Parsed from a raw page item during transformation.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayedItem {
    /// When the track was played, in epoch milliseconds
    #[serde(deserialize_with = "de_played_at")]
    pub played_at: i64,

    /// The track that was played
    pub track: Track,

    /// Playback context (playlist, album, ...), when the API reports one
    #[serde(default)]
    pub context: Option<PlayContext>,
}

/// Track metadata carried on a play event
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    /// Stable track identifier; keys the emitted record together with the user
    pub id: String,

    /// Track title
    #[serde(default)]
    pub name: Option<String>,

    /// Performing artists
    #[serde(default)]
    pub artists: Vec<Artist>,

    /// Album title
    #[serde(default)]
    pub album: Option<String>,

    /// Track length in milliseconds
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

/// One performing artist
#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    /// Artist identifier
    #[serde(default)]
    pub id: Option<String>,

    /// Artist name
    pub name: String,
}

/// Where a play originated
#[derive(Debug, Clone, Deserialize)]
pub struct PlayContext {
    /// Context kind, e.g. "playlist" or "album"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Context URI
    #[serde(default)]
    pub uri: Option<String>,
}

// ============================================================================
// Lenient deserializers
// ============================================================================

/// Accept cursor metadata as a single object, an array, or null.
fn de_cursor_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<PageCursors>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PageCursors),
        Many(Vec<PageCursors>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(entry)) => vec![entry],
        Some(OneOrMany::Many(entries)) => entries,
    })
}

/// Accept a cursor value as a string, an integer, or null.
fn de_scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
    }

    Ok(
        Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
            Scalar::Text(text) => text,
            Scalar::Int(n) => n.to_string(),
        }),
    )
}

/// Accept a play timestamp as integer milliseconds or an RFC 3339 string.
fn de_played_at<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stamp {
        Millis(i64),
        Rfc3339(String),
    }

    match Stamp::deserialize(deserializer)? {
        Stamp::Millis(ms) => Ok(ms),
        Stamp::Rfc3339(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.timestamp_millis())
            .map_err(serde::de::Error::custom),
    }
}
