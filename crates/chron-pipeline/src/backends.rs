//! The downstream stores the pipeline writes to and reads from.
//!
//! Components take these as `Arc<dyn _>` handed in at construction, so tests
//! can substitute doubles and the binary decides what gets opened.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use chron_config::DatabaseConfig;
use chron_core::{ChangeEvent, Collection};
use chron_db::{AuditLogStore, DatabaseError, DocumentDb};
use chron_lake::{LakeError, SnapshotArchive, UploadOutcome};

/// The document store of record, read whole by the snapshot builder.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Confirm the store is reachable before a capture starts.
    async fn connect(&self) -> Result<(), DatabaseError>;

    /// Every document in `collection`.
    async fn read_collection(&self, collection: Collection) -> Result<Vec<Value>, DatabaseError>;
}

/// Where change events are recorded.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one event and return its sequence number.
    async fn append_event(&self, event: &ChangeEvent) -> Result<i64, DatabaseError>;
}

/// Where snapshot artifacts are archived.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    async fn upload(&self, snapshot_id: &str, body: &[u8]) -> Result<UploadOutcome, LakeError>;

    /// Destination URI of an object key, for log lines.
    fn uri_for(&self, key: &str) -> String;
}

#[async_trait]
impl DocumentSource for DocumentDb {
    async fn connect(&self) -> Result<(), DatabaseError> {
        self.ping().await
    }

    async fn read_collection(&self, collection: Collection) -> Result<Vec<Value>, DatabaseError> {
        Self::read_collection(self, collection).await
    }
}

/// A document store opened on first use.
///
/// A store that cannot be opened fails the snapshot that needed it, and the
/// next capture tries again. Startup does not depend on it.
pub struct LazyDocuments {
    config: DatabaseConfig,
    db: OnceCell<DocumentDb>,
}

impl LazyDocuments {
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    async fn db(&self) -> Result<&DocumentDb, DatabaseError> {
        self.db
            .get_or_try_init(|| DocumentDb::open(&self.config))
            .await
    }
}

#[async_trait]
impl DocumentSource for LazyDocuments {
    async fn connect(&self) -> Result<(), DatabaseError> {
        self.db().await?.ping().await
    }

    async fn read_collection(&self, collection: Collection) -> Result<Vec<Value>, DatabaseError> {
        self.db().await?.read_collection(collection).await
    }
}

#[async_trait]
impl AuditSink for AuditLogStore {
    async fn append_event(&self, event: &ChangeEvent) -> Result<i64, DatabaseError> {
        self.append(event).await.map(|record| record.seq)
    }
}

#[async_trait]
impl ArchiveSink for SnapshotArchive {
    async fn upload(&self, snapshot_id: &str, body: &[u8]) -> Result<UploadOutcome, LakeError> {
        Self::upload(self, snapshot_id, body).await
    }

    fn uri_for(&self, key: &str) -> String {
        Self::uri_for(self, key)
    }
}
