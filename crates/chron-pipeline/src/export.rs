//! The snapshot export loop.
//!
//! Each snapshot message is stored as one blob at
//! `<prefix>/<snapshotId>.json`, body unchanged. Uploads are create-only, so a
//! redelivered message finds its blob already there and is committed as done.

use std::sync::Arc;
use std::time::Duration;

use chron_lake::UploadOutcome;
use chron_queue::{Consumer, Delivery, TransportError};

use crate::backends::ArchiveSink;
use crate::dead_letter::{DeadLetter, DeadLetterStage, DeadLetterWriter};
use crate::error::ExportError;
use crate::ingest::DEFAULT_READ_BACKOFF;
use crate::retry::RetryPolicy;
use crate::stats::ExportStats;

/// Result of handling one snapshot message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported { snapshot_id: String, key: String, size: usize },
    /// The blob was written by an earlier delivery.
    AlreadyExported { snapshot_id: String, key: String },
    /// No snapshot id could be found; dropped.
    Skipped,
    DeadLettered,
    /// Neither uploaded nor dead-lettered; will be retried.
    Held,
    ReadError,
    Closed,
}

impl ExportOutcome {
    const fn commits(&self) -> bool {
        matches!(
            self,
            Self::Exported { .. } | Self::AlreadyExported { .. } | Self::Skipped | Self::DeadLettered
        )
    }
}

/// The snapshot id a message refers to: its key, else the body's `snapshotId`.
///
/// # Errors
///
/// Returns `ExportError::MissingSnapshotId` if neither is usable.
pub fn resolve_snapshot_id(delivery: &Delivery) -> Result<String, ExportError> {
    if let Some(key) = delivery.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    serde_json::from_slice::<serde_json::Value>(&delivery.payload)
        .ok()
        .and_then(|body| {
            body.get("snapshotId")
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .ok_or(ExportError::MissingSnapshotId {
            offset: delivery.offset,
        })
}

pub struct SnapshotExporter<C> {
    consumer: C,
    archive: Arc<dyn ArchiveSink>,
    dead_letters: DeadLetterWriter,
    retry: RetryPolicy,
    read_backoff: Duration,
    stats: Arc<ExportStats>,
    held: Option<Delivery>,
}

impl<C: Consumer> SnapshotExporter<C> {
    #[must_use]
    pub fn new(consumer: C, archive: Arc<dyn ArchiveSink>, dead_letters: DeadLetterWriter) -> Self {
        Self {
            consumer,
            archive,
            dead_letters,
            retry: RetryPolicy::default(),
            read_backoff: DEFAULT_READ_BACKOFF,
            stats: Arc::new(ExportStats::default()),
            held: None,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_read_backoff(mut self, read_backoff: Duration) -> Self {
        self.read_backoff = read_backoff;
        self
    }

    #[must_use]
    pub fn stats(&self) -> Arc<ExportStats> {
        Arc::clone(&self.stats)
    }

    /// Consume until the transport closes.
    pub async fn run(mut self) {
        tracing::info!("export loop started");
        while self.process_next().await != ExportOutcome::Closed {}
        tracing::info!(counts = ?self.stats.counts(), "export loop stopped");
    }

    /// Receive and handle exactly one snapshot message.
    pub async fn process_next(&mut self) -> ExportOutcome {
        let delivery = if let Some(held) = self.held.take() {
            tokio::time::sleep(self.read_backoff).await;
            held
        } else {
            match self.consumer.recv().await {
                Ok(delivery) => {
                    self.stats.received();
                    delivery
                }
                Err(TransportError::Closed) => return ExportOutcome::Closed,
                Err(error) => {
                    self.stats.read_error();
                    tracing::warn!(%error, "snapshot read failed, backing off");
                    tokio::time::sleep(self.read_backoff).await;
                    return ExportOutcome::ReadError;
                }
            }
        };

        let outcome = self.handle(&delivery).await;
        if outcome.commits() {
            if let Err(error) = self.consumer.commit(&delivery).await {
                self.stats.commit_error();
                tracing::warn!(offset = delivery.offset, %error, "offset commit failed");
            }
        } else if outcome == ExportOutcome::Held {
            self.held = Some(delivery);
        }
        outcome
    }

    async fn handle(&self, delivery: &Delivery) -> ExportOutcome {
        let snapshot_id = match resolve_snapshot_id(delivery) {
            Ok(id) => id,
            Err(error) => {
                self.stats.skipped();
                tracing::error!(%error, "dropping snapshot message");
                return ExportOutcome::Skipped;
            }
        };

        let uploaded = self
            .retry
            .run(
                "snapshot upload",
                || self.archive.upload(&snapshot_id, &delivery.payload),
                chron_lake::LakeError::is_transient,
            )
            .await;

        match uploaded {
            Ok(UploadOutcome::Created { key, size }) => {
                self.stats.exported();
                tracing::info!(
                    snapshot_id = %snapshot_id,
                    bytes = size,
                    uri = %self.archive.uri_for(&key),
                    "snapshot exported"
                );
                ExportOutcome::Exported {
                    snapshot_id,
                    key,
                    size,
                }
            }
            Ok(UploadOutcome::AlreadyExists { key }) => {
                self.stats.already_exported();
                tracing::info!(
                    snapshot_id = %snapshot_id,
                    uri = %self.archive.uri_for(&key),
                    "snapshot already exported"
                );
                ExportOutcome::AlreadyExported { snapshot_id, key }
            }
            Err(source) => {
                let error = ExportError::Upload {
                    snapshot_id,
                    source,
                };
                let letter = DeadLetter::from_delivery(
                    DeadLetterStage::SnapshotExport,
                    delivery,
                    &error.to_string(),
                );
                match self.dead_letters.append(&letter) {
                    Ok(_) => {
                        self.stats.dead_lettered();
                        ExportOutcome::DeadLettered
                    }
                    Err(dl_error) => {
                        self.stats.uncommitted();
                        tracing::error!(
                            offset = delivery.offset,
                            %error,
                            dead_letter_error = %dl_error,
                            "snapshot neither exported nor dead-lettered, holding it"
                        );
                        ExportOutcome::Held
                    }
                }
            }
        }
    }
}
