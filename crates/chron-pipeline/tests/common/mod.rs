//! Test doubles for the pipeline seams.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use chron_core::{ChangeEvent, Collection};
use chron_db::{AuditLogStore, DatabaseError};
use chron_lake::{LakeError, UploadOutcome};
use chron_pipeline::{
    ArchiveSink, AuditSink, DocumentSource, RetryPolicy, SnapshotBuilder, SnapshotHandle,
    SnapshotWorker, snapshot_channel,
};
use chron_queue::{Consumer, Delivery, Publisher, TransportError};

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

pub fn delivery(offset: i64, key: Option<&str>, body: &[u8]) -> Delivery {
    Delivery {
        topic: "test-topic".into(),
        offset,
        key: key.map(Into::into),
        payload: body.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Hands out a fixed script of reads, then reports the transport closed.
pub struct ScriptedConsumer {
    script: VecDeque<Result<Delivery, TransportError>>,
    pub commits: Arc<Mutex<Vec<i64>>>,
}

impl ScriptedConsumer {
    pub fn new(script: Vec<Result<Delivery, TransportError>>) -> Self {
        Self {
            script: script.into(),
            commits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn of_bodies(bodies: &[&[u8]]) -> Self {
        Self::new(
            bodies
                .iter()
                .zip(1_i64..)
                .map(|(body, offset)| Ok(delivery(offset, None, body)))
                .collect(),
        )
    }
}

#[async_trait]
impl Consumer for ScriptedConsumer {
    async fn recv(&mut self) -> Result<Delivery, TransportError> {
        self.script.pop_front().unwrap_or(Err(TransportError::Closed))
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), TransportError> {
        self.commits.lock().unwrap().push(delivery.offset);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDocuments {
    pub collections: HashMap<Collection, Vec<Value>>,
    pub fail_connect: bool,
    pub fail_collection: Option<Collection>,
}

impl MemoryDocuments {
    pub fn with_counts(groups: usize, tasks: usize, comments: usize, users: usize) -> Self {
        let docs = |n: usize, prefix: &str| {
            (0..n)
                .map(|i| json!({ "_id": format!("{prefix}-{i}"), "name": format!("{prefix} {i}") }))
                .collect::<Vec<_>>()
        };
        let mut collections = HashMap::new();
        collections.insert(Collection::Groups, docs(groups, "g"));
        collections.insert(Collection::Tasks, docs(tasks, "t"));
        collections.insert(Collection::Comments, docs(comments, "c"));
        collections.insert(Collection::Users, docs(users, "u"));
        Self {
            collections,
            ..Self::default()
        }
    }
}

#[async_trait]
impl DocumentSource for MemoryDocuments {
    async fn connect(&self) -> Result<(), DatabaseError> {
        if self.fail_connect {
            return Err(DatabaseError::Query("connection refused".into()));
        }
        Ok(())
    }

    async fn read_collection(&self, collection: Collection) -> Result<Vec<Value>, DatabaseError> {
        if self.fail_collection == Some(collection) {
            return Err(DatabaseError::Query(format!("cursor lost on {collection}")));
        }
        Ok(self.collections.get(&collection).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(Option<String>, Vec<u8>)>>,
    pub failures_left: AtomicU32,
}

impl RecordingPublisher {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, key: Option<&str>, payload: &[u8]) -> Result<i64, TransportError> {
        if take_failure(&self.failures_left) {
            return Err(TransportError::NoResult);
        }
        let mut published = self.published.lock().unwrap();
        published.push((key.map(Into::into), payload.to_vec()));
        Ok(i64::try_from(published.len()).unwrap())
    }
}

// ---------------------------------------------------------------------------
// Audit sink
// ---------------------------------------------------------------------------

/// Wraps a real store and fails the first `failures_left` appends.
pub struct FlakyAudit {
    pub store: Arc<AuditLogStore>,
    pub failures_left: AtomicU32,
}

impl FlakyAudit {
    pub fn new(store: Arc<AuditLogStore>, failures: u32) -> Self {
        Self {
            store,
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl AuditSink for FlakyAudit {
    async fn append_event(&self, event: &ChangeEvent) -> Result<i64, DatabaseError> {
        if take_failure(&self.failures_left) {
            return Err(DatabaseError::Query("database is locked".into()));
        }
        self.store.append_event(event).await
    }
}

/// Rejects every append with an error that retrying cannot fix.
#[derive(Default)]
pub struct RejectingAudit {
    pub attempts: AtomicU32,
}

#[async_trait]
impl AuditSink for RejectingAudit {
    async fn append_event(&self, _event: &ChangeEvent) -> Result<i64, DatabaseError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DatabaseError::NotConfigured("audit".into()))
    }
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// An archive whose store is always unreachable.
pub struct UnreachableArchive;

#[async_trait]
impl ArchiveSink for UnreachableArchive {
    async fn upload(&self, _snapshot_id: &str, _body: &[u8]) -> Result<UploadOutcome, LakeError> {
        Err(LakeError::ObjectStore(object_store::Error::Generic {
            store: "S3",
            source: "connection reset by peer".into(),
        }))
    }

    fn uri_for(&self, key: &str) -> String {
        format!("s3://unreachable/{key}")
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

pub async fn memory_store() -> Arc<AuditLogStore> {
    Arc::new(AuditLogStore::open_local(":memory:").await.unwrap())
}

/// A snapshot worker over in-memory doubles, plus its publisher.
pub fn snapshot_worker(
    documents: MemoryDocuments,
    audit: Arc<AuditLogStore>,
    capacity: usize,
) -> (SnapshotHandle, SnapshotWorker, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let builder = SnapshotBuilder::new(Arc::new(documents), publisher.clone(), audit)
        .with_retry(fast_retry());
    let (handle, worker) = snapshot_channel(builder, capacity);
    (handle, worker, publisher)
}
