use clap::Subcommand;

/// Audit log queries.
#[derive(Clone, Debug, Subcommand)]
pub enum LogsCommands {
    /// Entries recorded for a group.
    Group { id: String },
    /// Entries recorded for a task.
    Task { id: String },
    /// Most recent entries across everything.
    Recent,
}

/// Activity aggregates.
#[derive(Clone, Debug, Subcommand)]
pub enum SummaryCommands {
    /// One row per group.
    Groups,
    /// One row per task.
    Tasks {
        /// Only tasks of this group
        #[arg(long)]
        group: Option<String>,
    },
}

/// Snapshot archive reads, and restore from the archive.
#[derive(Clone, Debug, Subcommand)]
pub enum SnapshotCommands {
    /// Archived snapshots, newest first.
    List,
    /// One archived artifact.
    Show {
        id: String,
        /// Print only identity and counts
        #[arg(long)]
        summary: bool,
    },
    /// Replace the document store's contents with an archived snapshot.
    Restore { id: String },
}
