//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Playback-history source connector CLI
#[derive(Parser, Debug)]
#[command(name = "playfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, same keys as the host property map)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify credentials and connectivity with a single fetch
    Check,

    /// Run the connector, printing records to stdout as JSON lines
    Run {
        /// Offsets file holding each partition's committed resume point
        #[arg(short, long, default_value = "playfeed-offsets.json")]
        offsets: PathBuf,

        /// Stop after this many poll cycles (0 = run until interrupted)
        #[arg(long, default_value = "0")]
        max_cycles: usize,
    },

    /// Parse and validate a configuration file
    Validate,
}
