//! The polling loop
//!
//! One `Poller` owns one partition's cursor for the lifetime of a task and
//! is the only component that mutates it. Each cycle sleeps out the
//! configured interval, fetches one page after the current cursor, advances
//! the cursor from the page's metadata, reverses the page into oldest-first
//! order, and transforms it into emitted records.
//!
//! Every per-cycle failure is absorbed: a failed fetch abandons the cycle
//! with no state change, a malformed cursor entry is skipped, an
//! untransformable event is dropped from the batch. The host retries simply
//! by polling again.

mod types;

pub use types::{PollStats, PollerState};

use crate::offset::CursorState;
use crate::record::{RecordTransformer, SourceRecord};
use crate::source::{HistoryPage, PlaybackSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// The orchestrating poll loop for one partition
pub struct Poller {
    /// Page source
    source: Arc<dyn PlaybackSource>,
    /// Event-to-record mapping for this partition
    transformer: RecordTransformer,
    /// In-memory resume point; durable only once the host commits it
    cursor: CursorState,
    /// Sleep duration at the start of each cycle
    interval: Duration,
    /// Current state-machine position
    state: PollerState,
    /// Cycle statistics
    stats: PollStats,
    /// Host stop signal; observed before each cycle and during the sleep
    shutdown: watch::Receiver<bool>,
}

impl Poller {
    /// Create a poller starting from the given cursor
    pub fn new(
        source: Arc<dyn PlaybackSource>,
        transformer: RecordTransformer,
        cursor: CursorState,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            transformer,
            cursor,
            interval,
            state: PollerState::Idle,
            stats: PollStats::new(),
            shutdown,
        }
    }

    /// The current in-memory cursor
    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    /// The current state-machine position
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Statistics accumulated so far
    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// Run one poll cycle and return the batch for the host to deliver.
    ///
    /// The returned batch is ordered oldest to newest, so a host that
    /// commits in emission order can never leave a gap behind a committed
    /// record. An empty batch means nothing new, a stop, or an absorbed
    /// fetch failure; none of these is an error to the host.
    pub async fn poll(&mut self) -> Vec<SourceRecord> {
        if self.state.is_stopped() || *self.shutdown.borrow() {
            self.state = PollerState::Stopped;
            return Vec::new();
        }

        self.stats.add_cycle();

        self.state = PollerState::Waiting;
        if !self.wait_for_interval().await {
            debug!(partition = %self.transformer.partition(), "stop observed during wait");
            self.state = PollerState::Stopped;
            return Vec::new();
        }

        self.state = PollerState::Fetching;
        let page = match self.source.fetch(self.cursor).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    partition = %self.transformer.partition(),
                    cursor = %self.cursor,
                    error = %e,
                    "fetch failed, cycle abandoned"
                );
                self.stats.add_fetch_error();
                self.state = PollerState::Idle;
                return Vec::new();
            }
        };
        self.stats.add_page();

        self.advance_cursor(&page);

        self.state = PollerState::Transforming;
        let records = self.transform_page(page);
        self.stats.add_emitted(records.len());

        self.state = PollerState::Emitted;
        debug!(
            partition = %self.transformer.partition(),
            emitted = records.len(),
            cursor = %self.cursor,
            "cycle complete"
        );
        self.state = PollerState::Idle;

        records
    }

    /// Apply the page's cursor metadata to the in-memory cursor.
    ///
    /// Every entry is scanned; among entries carrying a non-null `after`,
    /// the last parsable one wins. A page with no metadata leaves the cursor
    /// untouched, so an empty result cannot corrupt the resume point, and a
    /// candidate behind the current cursor is ignored to keep the cursor
    /// monotone.
    fn advance_cursor(&mut self, page: &HistoryPage) {
        let mut candidate = None;
        for entry in &page.cursors {
            match entry.after_timestamp() {
                None => {}
                Some(Ok(millis)) => candidate = Some(millis),
                Some(Err(e)) => {
                    warn!(error = %e, "ignoring malformed cursor entry");
                }
            }
        }

        if let Some(millis) = candidate {
            if !self.cursor.advance_to(millis) {
                debug!(
                    candidate = millis,
                    cursor = %self.cursor,
                    "cursor candidate not ahead of current position"
                );
            }
        }
    }

    /// Reverse the page into oldest-first order and transform each event.
    ///
    /// The API returns newest-first; emitting oldest-first means any
    /// committed record implies all older records were committed too. An
    /// event that fails to transform is logged and dropped, never stalling
    /// the rest of the page.
    fn transform_page(&mut self, page: HistoryPage) -> Vec<SourceRecord> {
        let mut records = Vec::with_capacity(page.len());

        for item in page.items.into_iter().rev() {
            match self.transformer.transform(&item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        partition = %self.transformer.partition(),
                        error = %e,
                        "skipping untransformable event"
                    );
                    self.stats.add_skipped();
                }
            }
        }

        records
    }

    /// Sleep out the poll interval, waking early on the stop signal.
    ///
    /// Returns false when the task should stop instead of fetching.
    async fn wait_for_interval(&mut self) -> bool {
        tokio::select! {
            () = tokio::time::sleep(self.interval) => true,
            changed = self.shutdown.changed() => match changed {
                Ok(()) => !*self.shutdown.borrow(),
                // Sender dropped: the host is gone, stop polling
                Err(_) => false,
            },
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("cursor", &self.cursor)
            .field("interval", &self.interval)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
