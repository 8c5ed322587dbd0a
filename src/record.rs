//! Record transformation
//!
//! Maps one foreign play event into the emitted record's key/value/offset
//! triple. Pure, no I/O; a malformed event surfaces as `Error::Transform`
//! and aborts only that record.

use crate::error::{Error, Result};
use crate::offset::{CursorState, PartitionKey};
use crate::source::PlayedItem;
use crate::types::JsonValue;
use serde_json::json;

/// A record emitted toward the downstream log.
///
/// Immutable once produced. The offset riding along is the event's own play
/// timestamp; once the host durably writes the record, that offset becomes
/// the partition's committed resume point.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SourceRecord {
    /// Destination topic
    pub topic: String,
    /// Partition this record belongs to
    pub partition: PartitionKey,
    /// Message key: user identity plus the event's track id
    pub key: JsonValue,
    /// Message value: structured projection of the play event
    pub value: JsonValue,
    /// Per-record offset, `{"played_at": <millis>}`
    pub offset: CursorState,
}

/// Maps foreign play events into emitted records for one partition
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    topic: String,
    partition: PartitionKey,
}

impl RecordTransformer {
    /// Create a transformer for one topic and partition
    pub fn new(topic: impl Into<String>, partition: PartitionKey) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }

    /// The partition this transformer stamps onto records
    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    /// Transform one raw page item into an emitted record.
    pub fn transform(&self, item: &JsonValue) -> Result<SourceRecord> {
        let played: PlayedItem = serde_json::from_value(item.clone())
            .map_err(|e| Error::transform(format!("unparsable play event: {e}")))?;

        if played.track.id.is_empty() {
            return Err(Error::transform("play event has an empty track id"));
        }

        let key = json!({
            "username": self.partition.username(),
            "track_id": played.track.id,
        });

        let artists: Vec<&str> = played
            .track
            .artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect();

        let value = json!({
            "track_id": played.track.id,
            "track_name": played.track.name,
            "artists": artists,
            "album": played.track.album,
            "duration_ms": played.track.duration_ms,
            "played_at": played.played_at,
            "context": played.context.as_ref().map(|c| json!({
                "type": c.kind,
                "uri": c.uri,
            })),
        });

        Ok(SourceRecord {
            topic: self.topic.clone(),
            partition: self.partition.clone(),
            key,
            value,
            offset: CursorState::new(played.played_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transformer() -> RecordTransformer {
        RecordTransformer::new("plays", PartitionKey::new("alice"))
    }

    #[test]
    fn test_transform_full_event() {
        let item = json!({
            "played_at": 1500,
            "track": {
                "id": "t1",
                "name": "Song",
                "artists": [{"name": "Band"}, {"name": "Guest"}],
                "album": "Album",
                "duration_ms": 200000
            },
            "context": {"type": "playlist", "uri": "playlist:xyz"}
        });

        let record = transformer().transform(&item).unwrap();

        assert_eq!(record.topic, "plays");
        assert_eq!(record.partition, PartitionKey::new("alice"));
        assert_eq!(
            record.key,
            json!({"username": "alice", "track_id": "t1"})
        );
        assert_eq!(record.value["track_name"], "Song");
        assert_eq!(record.value["artists"], json!(["Band", "Guest"]));
        assert_eq!(record.value["played_at"], 1500);
        assert_eq!(record.value["context"]["type"], "playlist");
        assert_eq!(record.offset, CursorState::new(1500));
    }

    #[test]
    fn test_transform_minimal_event() {
        let item = json!({
            "played_at": 42,
            "track": {"id": "t9"}
        });

        let record = transformer().transform(&item).unwrap();

        assert_eq!(record.offset, CursorState::new(42));
        assert_eq!(record.value["track_id"], "t9");
        assert_eq!(record.value["track_name"], JsonValue::Null);
        assert_eq!(record.value["artists"], json!([]));
        assert_eq!(record.value["context"], JsonValue::Null);
    }

    #[test]
    fn test_transform_offset_matches_event_timestamp() {
        let item = json!({"played_at": 987654, "track": {"id": "t1"}});
        let record = transformer().transform(&item).unwrap();
        assert_eq!(record.offset.millis(), 987_654);
    }

    #[test]
    fn test_transform_rejects_missing_track() {
        let item = json!({"played_at": 100});
        let err = transformer().transform(&item).unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }

    #[test]
    fn test_transform_rejects_empty_track_id() {
        let item = json!({"played_at": 100, "track": {"id": ""}});
        let err = transformer().transform(&item).unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }

    #[test]
    fn test_transform_rejects_garbage_timestamp() {
        let item = json!({"played_at": "noon-ish", "track": {"id": "t1"}});
        let err = transformer().transform(&item).unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }

    #[test]
    fn test_offset_serializes_as_played_at() {
        let record = transformer()
            .transform(&json!({"played_at": 77, "track": {"id": "t1"}}))
            .unwrap();
        let json = serde_json::to_value(&record.offset).unwrap();
        assert_eq!(json, json!({"played_at": 77}));
    }
}
