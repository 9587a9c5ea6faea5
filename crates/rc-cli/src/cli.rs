//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Channel attendance tracker.
///
/// Correlates presence signals for one watched channel into attendance
/// records, classifies entry punctuality, and delivers the results to an
/// external ledger with spill-to-disk durability.
#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Consume presence signals from stdin and record attendance.
    Run,

    /// Redeliver spilled records to the ledger.
    Replay,

    /// Declare absence for the current local date.
    Absence {
        /// Participant ID.
        #[arg(long)]
        id: String,

        /// Account username.
        #[arg(long)]
        username: String,

        /// Display name.
        #[arg(long)]
        display_name: String,
    },

    /// Install header rows in the ledger tables.
    Setup,

    /// Show spill queue status.
    Status,
}
