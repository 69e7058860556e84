//! Pipeline error types.

use chron_core::Collection;
use chron_db::DatabaseError;
use chron_lake::LakeError;
use chron_queue::TransportError;
use thiserror::Error;

/// Why a snapshot build produced no artifact.
///
/// Nothing is published and no audit record is written for a failed build.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Document store unavailable: {0}")]
    Connect(#[source] DatabaseError),

    #[error("Failed to read {collection}: {source}")]
    CollectionRead {
        collection: Collection,
        source: DatabaseError,
    },

    /// Groups, tasks, and comments were all empty.
    #[error("Snapshot is empty: no groups, tasks, or comments to capture")]
    EmptyCapture,

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to publish snapshot {snapshot_id}: {source}")]
    Publish {
        snapshot_id: String,
        source: TransportError,
    },

    /// The snapshot was published but its completion record was not written.
    #[error("Snapshot {snapshot_id} published but not recorded: {source}")]
    AuditAppend {
        snapshot_id: String,
        source: DatabaseError,
    },
}

/// Failure to archive one snapshot message.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Neither the message key nor the body names the snapshot.
    #[error("Snapshot message at offset {offset} has no snapshot id")]
    MissingSnapshotId { offset: i64 },

    #[error("Upload of {snapshot_id} failed: {source}")]
    Upload {
        snapshot_id: String,
        source: LakeError,
    },
}

/// Failure to write the dead-letter journal.
#[derive(Debug, Error)]
pub enum DeadLetterError {
    #[error("Dead-letter journal disabled")]
    Disabled,

    #[error("Dead-letter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to put an archived snapshot back into the document store.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Failed to fetch snapshot {snapshot_id}: {source}")]
    Fetch {
        snapshot_id: String,
        source: LakeError,
    },

    /// The store was left as it was: the replacement is one transaction.
    #[error("Failed to restore snapshot {snapshot_id}: {source}")]
    Write {
        snapshot_id: String,
        source: DatabaseError,
    },
}
