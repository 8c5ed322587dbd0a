//! Offset store implementations
//!
//! The poller only ever *reads* committed offsets, and only at startup. The
//! write side belongs to whichever host delivers records downstream: after a
//! record is durably written, the offset that accompanied it becomes the new
//! resume point for its partition. A crash between emit and commit therefore
//! re-emits the overlap on the next run, which is the intended at-least-once
//! behavior.

use super::types::{CursorState, PartitionKey};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read-only view of durably committed offsets.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// The last committed cursor for `partition`, if any prior run committed one.
    async fn load(&self, partition: &PartitionKey) -> Result<Option<CursorState>>;
}

/// File-backed offset store with atomic writes.
///
/// One JSON document holds every partition's committed cursor, keyed by the
/// partition's canonical form. An empty path selects in-memory mode, used by
/// tests and by hosts that manage commits elsewhere.
#[derive(Debug)]
pub struct FileOffsetStore {
    /// Path to the offsets file
    path: PathBuf,
    /// Committed cursors, keyed by `PartitionKey::storage_key`
    offsets: Arc<RwLock<HashMap<String, CursorState>>>,
}

impl FileOffsetStore {
    /// Create a store backed by `path`, starting empty
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            offsets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create an in-memory store (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            offsets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a store, loading existing offsets if the file is present
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let offsets = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::State {
                message: format!("Failed to read offsets file: {e}"),
            })?;
            serde_json::from_str(&contents).map_err(|e| Error::State {
                message: format!("Failed to parse offsets file: {e}"),
            })?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            offsets: Arc::new(RwLock::new(offsets)),
        })
    }

    /// Record a durably delivered offset and persist it.
    ///
    /// Called by the host side after the accompanying record has been
    /// written downstream.
    pub async fn commit(&self, partition: &PartitionKey, cursor: CursorState) -> Result<()> {
        {
            let mut offsets = self.offsets.write().await;
            offsets.insert(partition.storage_key(), cursor);
        }
        self.save().await
    }

    /// Persist the current offsets to disk
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let contents = {
            let offsets = self.offsets.read().await;
            serde_json::to_string_pretty(&*offsets).map_err(|e| Error::State {
                message: format!("Failed to serialize offsets: {e}"),
            })?
        };

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to write offsets file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename offsets file: {e}"),
            })?;

        Ok(())
    }

    /// Drop every committed offset (administrative reset)
    pub async fn clear(&self) -> Result<()> {
        {
            let mut offsets = self.offsets.write().await;
            offsets.clear();
        }
        self.save().await
    }

    /// Get the offsets file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

#[async_trait]
impl OffsetStore for FileOffsetStore {
    async fn load(&self, partition: &PartitionKey) -> Result<Option<CursorState>> {
        let offsets = self.offsets.read().await;
        Ok(offsets.get(&partition.storage_key()).copied())
    }
}

impl Clone for FileOffsetStore {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            offsets: Arc::clone(&self.offsets),
        }
    }
}
