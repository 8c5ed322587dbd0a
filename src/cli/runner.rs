//! CLI runner - executes commands
//!
//! `run` doubles as a minimal host: it delivers each record to stdout as one
//! JSON line and only then commits the record's offset, so a crash between
//! the two re-emits that record on the next run rather than skipping it.

use crate::cli::commands::{Cli, Commands};
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::offset::{initial_cursor, FileOffsetStore};
use crate::source::{HttpPlaybackSource, PlaybackSource};
use crate::task::{PlayfeedTask, SourceTask};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Run {
                offsets,
                max_cycles,
            } => self.run_task(offsets, *max_cycles).await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load the connector configuration
    fn load_config(&self) -> Result<ConnectorConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Configuration file not specified (use -c flag)"))?;
        ConnectorConfig::from_yaml_file(path)
    }

    /// Verify credentials and connectivity with a single fetch
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let source = HttpPlaybackSource::from_config(&config)?;
        let cursor = initial_cursor(None, chrono::Utc::now(), config.lookback);

        let page = source.fetch(cursor).await?;
        println!(
            "OK: fetched {} event(s) for user '{}'",
            page.len(),
            config.username
        );
        Ok(())
    }

    /// Drive the task against a file-backed offset store
    async fn run_task(&self, offsets: &Path, max_cycles: usize) -> Result<()> {
        let config = self.load_config()?;
        let topic = config.topic.clone();

        let store = FileOffsetStore::open(offsets)?;
        let mut task = PlayfeedTask::new(Arc::new(store.clone()));
        task.start_with_config(config).await?;

        let mut cycles = 0usize;
        loop {
            let records = tokio::select! {
                records = task.poll() => records?,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, stopping");
                    break;
                }
            };

            for record in records {
                // Deliver first, commit after: the at-least-once contract
                println!("{}", serde_json::to_string(&record)?);
                store.commit(&record.partition, record.offset).await?;
            }

            cycles += 1;
            if max_cycles > 0 && cycles >= max_cycles {
                info!(cycles, "cycle limit reached, stopping");
                break;
            }
        }

        task.stop().await;
        if let Some(stats) = task.stats() {
            info!(
                topic = %topic,
                cycles = stats.cycles,
                pages = stats.pages_fetched,
                emitted = stats.records_emitted,
                skipped = stats.records_skipped,
                fetch_errors = stats.fetch_errors,
                "run finished"
            );
        }

        Ok(())
    }

    /// Parse and validate a configuration file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        println!("Configuration OK");
        println!("  topic:         {}", config.topic);
        println!("  username:      {}", config.username);
        println!("  poll interval: {:?}", config.poll_interval);
        println!("  lookback:      {}s", config.lookback.num_seconds());
        println!("  base url:      {}", config.api.base_url);
        println!("  page limit:    {}", config.api.page_limit);
        println!(
            "  auth:          {}",
            if config.auth.refresh.is_some() {
                "oauth2 refresh flow"
            } else {
                "static bearer token"
            }
        );
        Ok(())
    }
}
