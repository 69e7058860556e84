//! Put an archived snapshot back into the document store.
//!
//! A restore writes no audit record: the audit log describes changes made by
//! the application, and a restore is an operator action on top of it.

use serde::Serialize;
use tracing::{info, warn};

use chron_core::SnapshotCounts;
use chron_db::DocumentDb;
use chron_lake::SnapshotArchive;

use crate::error::RestoreError;

/// What a restore wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub snapshot_id: String,
    pub restored_counts: SnapshotCounts,
}

/// Fetch `snapshot_id` from the archive and replace every collection with it.
///
/// # Errors
///
/// Returns `RestoreError::Fetch` if the artifact is missing, unreadable, or
/// holds another snapshot, and `RestoreError::Write` if the store rejects the
/// replacement.
pub async fn restore_snapshot(
    archive: &SnapshotArchive,
    documents: &DocumentDb,
    snapshot_id: &str,
) -> Result<RestoreReport, RestoreError> {
    let artifact = archive
        .fetch(snapshot_id)
        .await
        .map_err(|source| RestoreError::Fetch {
            snapshot_id: snapshot_id.to_string(),
            source,
        })?;
    if !artifact.counts_consistent() {
        warn!(snapshot_id, "artifact counts disagree with its data; restoring the data");
    }

    let restored_counts =
        documents
            .restore(&artifact.data)
            .await
            .map_err(|source| RestoreError::Write {
                snapshot_id: snapshot_id.to_string(),
                source,
            })?;
    info!(
        snapshot_id,
        groups = restored_counts.groups,
        tasks = restored_counts.tasks,
        comments = restored_counts.comments,
        users = restored_counts.users,
        "snapshot restored"
    );
    Ok(RestoreReport {
        snapshot_id: artifact.snapshot_id,
        restored_counts,
    })
}
