use clap::{Args, Subcommand};

use chrono::NaiveDate;

use crate::cli::subcommands::{LogsCommands, SnapshotCommands, SummaryCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run ingestion, the snapshot worker, and the exporter until Ctrl+C.
    Run,
    /// Run only the ingestion loop and its snapshot worker.
    Ingest,
    /// Run only the snapshot exporter.
    Export,
    /// Audit log entries, newest first.
    Logs {
        #[command(subcommand)]
        action: LogsCommands,
    },
    /// Per-group and per-task activity aggregates.
    Summary {
        #[command(subcommand)]
        action: SummaryCommands,
    },
    /// Archived snapshot artifacts, and restore from them.
    Snapshots {
        #[command(subcommand)]
        action: SnapshotCommands,
    },
    /// Messages that exhausted their retries.
    DeadLetters(DeadLetterArgs),
}

#[derive(Clone, Debug, Args)]
pub struct DeadLetterArgs {
    /// UTC day to read (YYYY-MM-DD); lists journal days when omitted
    #[arg(long)]
    pub day: Option<NaiveDate>,
}
