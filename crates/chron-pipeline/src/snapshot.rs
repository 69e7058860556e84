//! Snapshot capture and the worker that runs it off the ingestion loop.
//!
//! The builder reads every collection of the document store, rejects a
//! capture with no groups, tasks, or comments, publishes the artifact keyed by
//! its identifier, and records one `SNAPSHOT_CREATED` audit entry. Documents
//! are relayed as opaque JSON; consumers of archived snapshots own their
//! schema.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use chron_core::{ChangeEvent, Collection, SnapshotArtifact, SnapshotData};
use chron_db::DatabaseError;
use chron_queue::{Publisher, TransportError};

use crate::backends::{AuditSink, DocumentSource};
use crate::error::SnapshotError;
use crate::retry::RetryPolicy;

/// Identity recorded for snapshots nobody in particular asked for.
pub const SYSTEM_USER: &str = "system";

pub struct SnapshotBuilder {
    documents: Arc<dyn DocumentSource>,
    publisher: Arc<dyn Publisher>,
    audit: Arc<dyn AuditSink>,
    retry: RetryPolicy,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        publisher: Arc<dyn Publisher>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            documents,
            publisher,
            audit,
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy for the publish and the audit append.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Capture, publish, and record a snapshot stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::build_at`].
    pub async fn build(
        &self,
        trigger_reason: &str,
        acting_user: &str,
    ) -> Result<SnapshotArtifact, SnapshotError> {
        self.build_at(trigger_reason, acting_user, Utc::now()).await
    }

    /// Capture, publish, and record a snapshot stamped `created_at`.
    ///
    /// Only the publish and the audit append are retried.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` naming the step that failed. Nothing is
    /// published unless every collection was read and the capture is
    /// non-empty.
    pub async fn build_at(
        &self,
        trigger_reason: &str,
        acting_user: &str,
        created_at: DateTime<Utc>,
    ) -> Result<SnapshotArtifact, SnapshotError> {
        self.documents.connect().await.map_err(SnapshotError::Connect)?;

        let mut data = SnapshotData::default();
        for collection in Collection::ALL {
            let documents = self
                .documents
                .read_collection(collection)
                .await
                .map_err(|source| SnapshotError::CollectionRead { collection, source })?;
            tracing::debug!(%collection, count = documents.len(), "collection captured");
            data.set_collection(collection, documents);
        }

        if data.is_empty_capture() {
            return Err(SnapshotError::EmptyCapture);
        }

        let artifact = SnapshotArtifact::new(created_at, acting_user, data);
        let body = artifact.to_canonical_json()?;
        let snapshot_id = artifact.snapshot_id.clone();

        let offset = self
            .retry
            .run(
                "snapshot publish",
                || self.publisher.publish(Some(snapshot_id.as_str()), &body),
                |e| !matches!(e, TransportError::Closed | TransportError::NotConfigured),
            )
            .await
            .map_err(|source| SnapshotError::Publish {
                snapshot_id: snapshot_id.clone(),
                source,
            })?;

        let record = ChangeEvent::snapshot_created(
            &snapshot_id,
            artifact.change_summary(),
            acting_user,
            created_at,
        );
        self.retry
            .run(
                "snapshot audit append",
                || self.audit.append_event(&record),
                DatabaseError::is_transient,
            )
            .await
            .map_err(|source| SnapshotError::AuditAppend {
                snapshot_id: snapshot_id.clone(),
                source,
            })?;

        let counts = artifact.metadata.counts;
        tracing::info!(
            snapshot_id = %snapshot_id,
            reason = trigger_reason,
            user = acting_user,
            offset,
            bytes = body.len(),
            groups = counts.groups,
            tasks = counts.tasks,
            comments = counts.comments,
            users = counts.users,
            "snapshot published"
        );
        Ok(artifact)
    }
}

/// A request to capture a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub reason: String,
    pub requested_by: String,
}

impl SnapshotRequest {
    /// Build a request from a trigger event, defaulting blank fields.
    #[must_use]
    pub fn from_trigger(event: &ChangeEvent) -> Self {
        let reason = if event.changes.is_empty() {
            event.event_type.as_str().to_string()
        } else {
            event.changes.clone()
        };
        let requested_by = if event.user.is_empty() {
            SYSTEM_USER.to_string()
        } else {
            event.user.clone()
        };
        Self {
            reason,
            requested_by,
        }
    }
}

/// What happened to a snapshot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Waiting for the worker.
    Queued,
    /// A snapshot is already pending; this one adds nothing.
    Dropped,
    /// The worker has stopped.
    WorkerGone,
}

/// Sending half of the snapshot worker's queue.
#[derive(Clone)]
pub struct SnapshotHandle {
    tx: mpsc::Sender<SnapshotRequest>,
}

impl SnapshotHandle {
    /// Hand a request to the worker without waiting.
    #[must_use]
    pub fn request(&self, request: SnapshotRequest) -> TriggerOutcome {
        match self.tx.try_send(request) {
            Ok(()) => TriggerOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(request)) => {
                tracing::warn!(reason = %request.reason, "snapshot already pending, trigger dropped");
                TriggerOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(request)) => {
                tracing::error!(reason = %request.reason, "snapshot worker stopped, trigger lost");
                TriggerOutcome::WorkerGone
            }
        }
    }
}

/// Runs snapshot builds one at a time, in request order.
pub struct SnapshotWorker {
    builder: SnapshotBuilder,
    rx: mpsc::Receiver<SnapshotRequest>,
}

/// Create a worker whose queue holds at most `capacity` pending requests.
#[must_use]
pub fn snapshot_channel(builder: SnapshotBuilder, capacity: usize) -> (SnapshotHandle, SnapshotWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SnapshotHandle { tx }, SnapshotWorker { builder, rx })
}

impl SnapshotWorker {
    /// Build snapshots until every [`SnapshotHandle`] is dropped.
    ///
    /// Build failures are logged and do not stop the worker.
    pub async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            match self.builder.build(&request.reason, &request.requested_by).await {
                Ok(artifact) => {
                    tracing::debug!(snapshot_id = %artifact.snapshot_id, "snapshot request done");
                }
                Err(SnapshotError::EmptyCapture) => {
                    tracing::warn!(reason = %request.reason, "snapshot skipped: nothing to capture");
                }
                Err(error) => {
                    tracing::error!(reason = %request.reason, %error, "snapshot failed");
                }
            }
        }
        tracing::debug!("snapshot worker stopped");
    }

    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
