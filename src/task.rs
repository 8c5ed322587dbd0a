//! The source task: host framework boundary
//!
//! A host drives the connector through the `SourceTask` trait: configure it
//! once with `start`, call `poll` on a cadence, and `stop` it on shutdown.
//! The host owns delivery and offset commits; the task only ever reads
//! committed offsets, at startup, to pick its resume point.

use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::offset::{initial_cursor, OffsetStore};
use crate::poller::{PollStats, Poller, PollerState};
use crate::record::{RecordTransformer, SourceRecord};
use crate::source::{HttpPlaybackSource, PlaybackSource};
use crate::types::StringMap;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// The lifecycle contract a host scheduler drives.
///
/// `poll` is called repeatedly and synchronously; calls never overlap. An
/// empty batch is normal steady-state output. Only `start` may fail; every
/// per-cycle error is absorbed and retried on the next poll.
#[async_trait]
pub trait SourceTask: Send {
    /// Configure and initialize the task. Fatal on invalid configuration.
    async fn start(&mut self, config: StringMap) -> Result<()>;

    /// Run one poll cycle, returning records ordered oldest to newest.
    async fn poll(&mut self) -> Result<Vec<SourceRecord>>;

    /// Signal the task to stop. Takes effect before the next cycle or
    /// during the in-cycle wait; never interrupts an in-flight emission.
    async fn stop(&mut self);

    /// Connector version string
    fn version(&self) -> &str;
}

/// The playback-history source task
pub struct PlayfeedTask {
    /// Durable offsets, read once at start
    offset_store: Arc<dyn OffsetStore>,
    /// Source override for tests and embedders; built from config otherwise
    source_override: Option<Arc<dyn PlaybackSource>>,
    /// Live poller plus its stop handle, present between start and stop
    running: Option<Running>,
}

struct Running {
    poller: Poller,
    shutdown: watch::Sender<bool>,
}

impl PlayfeedTask {
    /// Create a task that reads committed offsets from `offset_store`
    pub fn new(offset_store: Arc<dyn OffsetStore>) -> Self {
        Self {
            offset_store,
            source_override: None,
            running: None,
        }
    }

    /// Create a task with a custom page source instead of the HTTP adapter
    pub fn with_source(offset_store: Arc<dyn OffsetStore>, source: Arc<dyn PlaybackSource>) -> Self {
        Self {
            offset_store,
            source_override: Some(source),
            running: None,
        }
    }

    /// Start from an already-built configuration.
    pub async fn start_with_config(&mut self, config: ConnectorConfig) -> Result<()> {
        if self.running.is_some() {
            return Err(Error::state("task already started"));
        }

        let partition = config.partition_key();

        let source: Arc<dyn PlaybackSource> = match &self.source_override {
            Some(source) => Arc::clone(source),
            None => Arc::new(HttpPlaybackSource::from_config(&config)?),
        };

        let durable = self.offset_store.load(&partition).await?;
        let cursor = initial_cursor(durable, chrono::Utc::now(), config.lookback);

        info!(
            partition = %partition,
            cursor = %cursor,
            resumed = durable.is_some(),
            "starting playback source task"
        );

        let transformer = RecordTransformer::new(config.topic.clone(), partition);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = Poller::new(source, transformer, cursor, config.poll_interval, shutdown_rx);

        self.running = Some(Running {
            poller,
            shutdown: shutdown_tx,
        });

        Ok(())
    }

    /// The in-memory cursor, once started
    pub fn cursor(&self) -> Option<crate::offset::CursorState> {
        self.running.as_ref().map(|r| r.poller.cursor())
    }

    /// The poller's state-machine position, once started
    pub fn poller_state(&self) -> Option<PollerState> {
        self.running.as_ref().map(|r| r.poller.state())
    }

    /// Cycle statistics, once started
    pub fn stats(&self) -> Option<&PollStats> {
        self.running.as_ref().map(|r| r.poller.stats())
    }
}

#[async_trait]
impl SourceTask for PlayfeedTask {
    async fn start(&mut self, config: StringMap) -> Result<()> {
        let config = ConnectorConfig::from_map(&config)?;
        self.start_with_config(config).await
    }

    async fn poll(&mut self) -> Result<Vec<SourceRecord>> {
        let running = self
            .running
            .as_mut()
            .ok_or_else(|| Error::state("task not started"))?;
        Ok(running.poller.poll().await)
    }

    async fn stop(&mut self) {
        if let Some(running) = &self.running {
            info!("stopping playback source task");
            // Receiver dropping with the poller also counts as a stop
            let _ = running.shutdown.send(true);
        }
    }

    fn version(&self) -> &str {
        crate::VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::{CursorState, FileOffsetStore, PartitionKey};
    use crate::source::HistoryPage;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct EmptySource;

    #[async_trait]
    impl PlaybackSource for EmptySource {
        async fn fetch(&self, _cursor: CursorState) -> Result<HistoryPage> {
            Ok(HistoryPage::default())
        }
    }

    fn test_config() -> ConnectorConfig {
        let mut map = StringMap::new();
        map.insert("topic".to_string(), "plays".to_string());
        map.insert("username".to_string(), "alice".to_string());
        map.insert("oauth.access.token".to_string(), "tok".to_string());
        map.insert("poll.interval.seconds".to_string(), "1".to_string());
        let mut config = ConnectorConfig::from_map(&map).unwrap();
        config.poll_interval = Duration::from_millis(5);
        config
    }

    #[tokio::test]
    async fn test_poll_before_start_fails() {
        let mut task = PlayfeedTask::new(Arc::new(FileOffsetStore::in_memory()));
        let err = task.poll().await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[tokio::test]
    async fn test_start_rejects_bad_config() {
        let mut task = PlayfeedTask::new(Arc::new(FileOffsetStore::in_memory()));
        let err = task.start(StringMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let mut task =
            PlayfeedTask::with_source(Arc::new(FileOffsetStore::in_memory()), Arc::new(EmptySource));
        task.start_with_config(test_config()).await.unwrap();
        let err = task.start_with_config(test_config()).await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[tokio::test]
    async fn test_resumes_from_committed_offset() {
        let store = Arc::new(FileOffsetStore::in_memory());
        store
            .commit(&PartitionKey::new("alice"), CursorState::new(123_456))
            .await
            .unwrap();

        let mut task = PlayfeedTask::with_source(store, Arc::new(EmptySource));
        task.start_with_config(test_config()).await.unwrap();

        assert_eq!(task.cursor(), Some(CursorState::new(123_456)));
    }

    #[tokio::test]
    async fn test_bootstraps_with_lookback_without_offset() {
        let mut task =
            PlayfeedTask::with_source(Arc::new(FileOffsetStore::in_memory()), Arc::new(EmptySource));
        let config = test_config();
        let lookback = config.lookback;
        let before = chrono::Utc::now();
        task.start_with_config(config).await.unwrap();
        let after = chrono::Utc::now();

        let cursor = task.cursor().unwrap().millis();
        assert!(cursor >= (before - lookback).timestamp_millis());
        assert!(cursor <= (after - lookback).timestamp_millis());
    }

    #[tokio::test]
    async fn test_stop_ends_polling() {
        let mut task =
            PlayfeedTask::with_source(Arc::new(FileOffsetStore::in_memory()), Arc::new(EmptySource));
        task.start_with_config(test_config()).await.unwrap();

        task.stop().await;
        let records = task.poll().await.unwrap();

        assert!(records.is_empty());
        assert_eq!(task.poller_state(), Some(PollerState::Stopped));
    }

    #[tokio::test]
    async fn test_version_reports_crate_version() {
        let task = PlayfeedTask::new(Arc::new(FileOffsetStore::in_memory()));
        assert_eq!(task.version(), crate::VERSION);
    }
}
