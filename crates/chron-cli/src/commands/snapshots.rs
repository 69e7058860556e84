use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use chron_config::ChronicleConfig;
use chron_core::SnapshotCounts;
use chron_db::DocumentDb;
use chron_pipeline::restore_snapshot;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::SnapshotCommands;
use crate::output::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedSnapshot {
    snapshot_id: String,
    uri: String,
    size: u64,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotHeader {
    snapshot_id: String,
    version: u32,
    created_at: DateTime<Utc>,
    created_by: String,
    counts: SnapshotCounts,
    counts_consistent: bool,
}

/// Handle `chronicle snapshots`.
pub async fn handle(
    action: &SnapshotCommands,
    config: &ChronicleConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let archive = bootstrap::open_archive(config)?;
    match action {
        SnapshotCommands::List => {
            let mut listed = archive
                .list()
                .await?
                .into_iter()
                .map(|entry| ListedSnapshot {
                    uri: archive.uri_for(&entry.key),
                    snapshot_id: entry.snapshot_id,
                    size: entry.size,
                    last_modified: entry.last_modified,
                })
                .collect::<Vec<_>>();
            if let Some(limit) = flags.limit {
                listed.truncate(usize::try_from(limit)?);
            }
            output(&listed, flags.format)
        }
        SnapshotCommands::Show { id, summary } => {
            let artifact = archive.fetch(id).await?;
            if *summary {
                output(
                    &SnapshotHeader {
                        counts_consistent: artifact.counts_consistent(),
                        snapshot_id: artifact.snapshot_id,
                        version: artifact.version,
                        created_at: artifact.created_at,
                        created_by: artifact.created_by,
                        counts: artifact.metadata.counts,
                    },
                    flags.format,
                )
            } else {
                output(&artifact, flags.format)
            }
        }
        SnapshotCommands::Restore { id } => {
            let documents = DocumentDb::open(&config.documents)
                .await
                .context("failed to open document store")?;
            let report = restore_snapshot(&archive, &documents, id).await?;
            output(&report, flags.format)
        }
    }
}
