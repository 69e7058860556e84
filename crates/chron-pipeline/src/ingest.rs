//! The change-event ingestion loop.
//!
//! One message at a time: receive, decode, then either hand a snapshot trigger
//! to the snapshot worker or append the event to the audit log. The offset is
//! committed only once the message has been dealt with: stored, judged
//! undecodable, dead-lettered, or handed off. A message that could neither be
//! stored nor dead-lettered is held and retried after the read backoff, so
//! nothing behind it is committed either.

use std::sync::Arc;
use std::time::Duration;

use chron_core::decode;
use chron_db::DatabaseError;
use chron_queue::{Consumer, Delivery, TransportError};

use crate::backends::AuditSink;
use crate::dead_letter::{DeadLetter, DeadLetterStage, DeadLetterWriter};
use crate::retry::RetryPolicy;
use crate::snapshot::{SnapshotHandle, SnapshotRequest, TriggerOutcome};
use crate::stats::IngestStats;

/// Wait after a failed read before trying again.
pub const DEFAULT_READ_BACKOFF: Duration = Duration::from_secs(2);

/// Result of handling one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored { seq: i64 },
    /// Undecodable; dropped.
    Skipped,
    SnapshotQueued,
    /// Not queued: one is already pending or the worker is gone.
    SnapshotDropped,
    DeadLettered,
    /// Neither stored nor dead-lettered; will be retried.
    Held,
    /// The read failed; the loop backed off.
    ReadError,
    /// The transport will deliver nothing more.
    Closed,
}

impl IngestOutcome {
    const fn commits(self) -> bool {
        matches!(
            self,
            Self::Stored { .. }
                | Self::Skipped
                | Self::SnapshotQueued
                | Self::SnapshotDropped
                | Self::DeadLettered
        )
    }
}

pub struct IngestionPipeline<C> {
    consumer: C,
    audit: Arc<dyn AuditSink>,
    snapshots: SnapshotHandle,
    dead_letters: DeadLetterWriter,
    retry: RetryPolicy,
    read_backoff: Duration,
    stats: Arc<IngestStats>,
    held: Option<Delivery>,
}

impl<C: Consumer> IngestionPipeline<C> {
    #[must_use]
    pub fn new(
        consumer: C,
        audit: Arc<dyn AuditSink>,
        snapshots: SnapshotHandle,
        dead_letters: DeadLetterWriter,
    ) -> Self {
        Self {
            consumer,
            audit,
            snapshots,
            dead_letters,
            retry: RetryPolicy::default(),
            read_backoff: DEFAULT_READ_BACKOFF,
            stats: Arc::new(IngestStats::default()),
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
    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Consume until the transport closes.
    ///
    /// Against a durable topic this never returns; process shutdown is the
    /// only way out.
    pub async fn run(mut self) {
        tracing::info!("ingestion loop started");
        while self.process_next().await != IngestOutcome::Closed {}
        tracing::info!(counts = ?self.stats.counts(), "ingestion loop stopped");
    }

    /// Receive and handle exactly one message.
    pub async fn process_next(&mut self) -> IngestOutcome {
        let delivery = if let Some(held) = self.held.take() {
            tokio::time::sleep(self.read_backoff).await;
            held
        } else {
            match self.consumer.recv().await {
                Ok(delivery) => {
                    self.stats.received();
                    delivery
                }
                Err(TransportError::Closed) => return IngestOutcome::Closed,
                Err(error) => {
                    self.stats.read_error();
                    tracing::warn!(%error, backoff_ms = self.backoff_ms(), "event read failed, backing off");
                    tokio::time::sleep(self.read_backoff).await;
                    return IngestOutcome::ReadError;
                }
            }
        };

        let outcome = self.handle(&delivery).await;
        if outcome.commits() {
            if let Err(error) = self.consumer.commit(&delivery).await {
                self.stats.commit_error();
                tracing::warn!(offset = delivery.offset, %error, "offset commit failed");
            }
        } else if outcome == IngestOutcome::Held {
            self.held = Some(delivery);
        }
        outcome
    }

    async fn handle(&self, delivery: &Delivery) -> IngestOutcome {
        let event = match decode(&delivery.payload) {
            Ok(event) => event,
            Err(error) => {
                self.stats.skipped();
                tracing::warn!(offset = delivery.offset, %error, "dropping undecodable event");
                return IngestOutcome::Skipped;
            }
        };

        if event.event_type.is_snapshot_trigger() {
            self.stats.snapshot_trigger();
            return match self.snapshots.request(SnapshotRequest::from_trigger(&event)) {
                TriggerOutcome::Queued => {
                    tracing::info!(offset = delivery.offset, user = %event.user, "snapshot requested");
                    IngestOutcome::SnapshotQueued
                }
                TriggerOutcome::Dropped | TriggerOutcome::WorkerGone => {
                    self.stats.snapshot_trigger_dropped();
                    IngestOutcome::SnapshotDropped
                }
            };
        }

        let appended = self
            .retry
            .run(
                "audit append",
                || self.audit.append_event(&event),
                DatabaseError::is_transient,
            )
            .await;
        match appended {
            Ok(seq) => {
                self.stats.stored();
                tracing::debug!(
                    seq,
                    offset = delivery.offset,
                    event_type = %event.event_type,
                    entity_id = %event.entity_id,
                    message = %event.display_message(),
                    "event stored"
                );
                IngestOutcome::Stored { seq }
            }
            Err(error) => {
                let letter =
                    DeadLetter::from_delivery(DeadLetterStage::AuditAppend, delivery, &error.to_string());
                match self.dead_letters.append(&letter) {
                    Ok(_) => {
                        self.stats.dead_lettered();
                        IngestOutcome::DeadLettered
                    }
                    Err(dl_error) => {
                        self.stats.uncommitted();
                        tracing::error!(
                            offset = delivery.offset,
                            %error,
                            dead_letter_error = %dl_error,
                            "event neither stored nor dead-lettered, holding it"
                        );
                        IngestOutcome::Held
                    }
                }
            }
        }
    }

    fn backoff_ms(&self) -> u64 {
        u64::try_from(self.read_backoff.as_millis()).unwrap_or(u64::MAX)
    }
}
