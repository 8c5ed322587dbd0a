//! Resume point value types and the bootstrap policy
//!
//! These types are serialized to JSON and persisted between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies the logical stream one task instance polls.
///
/// Assigned once at configuration time and immutable for the lifetime of the
/// task. Persisted offsets are keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    /// The user whose playback history this partition carries
    pub username: String,
}

impl PartitionKey {
    /// Create a partition key for a user
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// The user identity behind this partition
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Canonical string form, used to key the offset store
    pub fn storage_key(&self) -> String {
        // Single-field struct, so the JSON form is deterministic
        serde_json::to_string(self).expect("partition key serializes")
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "username={}", self.username)
    }
}

/// The durable resume point for one partition.
///
/// Holds a millisecond timestamp meaning "all events played at or before
/// this instant have been fetched". Monotonically non-decreasing for the
/// lifetime of a partition; only an out-of-band administrative reset may
/// rewind it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CursorState {
    /// Millisecond timestamp of the newest fetched event
    pub played_at: i64,
}

impl CursorState {
    /// Create a cursor at the given millisecond timestamp
    pub fn new(played_at: i64) -> Self {
        Self { played_at }
    }

    /// The cursor value in milliseconds
    pub fn millis(&self) -> i64 {
        self.played_at
    }

    /// Advance the cursor, ignoring values that would rewind it.
    ///
    /// Returns true if the cursor moved.
    pub fn advance_to(&mut self, millis: i64) -> bool {
        if millis > self.played_at {
            self.played_at = millis;
            true
        } else {
            false
        }
    }
}

impl std::fmt::Display for CursorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.played_at)
    }
}

/// Compute the cursor a task starts polling from.
///
/// A committed offset always wins: the task resumes exactly where the last
/// run's committed delivery left off. Without one, the first run reaches
/// back `lookback` from `now`. Pure function of its inputs.
pub fn initial_cursor(
    durable: Option<CursorState>,
    now: DateTime<Utc>,
    lookback: chrono::Duration,
) -> CursorState {
    match durable {
        Some(cursor) => cursor,
        None => CursorState::new((now - lookback).timestamp_millis()),
    }
}
