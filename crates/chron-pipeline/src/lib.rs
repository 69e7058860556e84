//! # chron-pipeline
//!
//! The moving parts of Chronicle:
//! - [`IngestionPipeline`] consumes change events and appends them to the
//!   audit log, handing snapshot triggers to the snapshot worker;
//! - [`SnapshotBuilder`] captures the document store into a
//!   [`chron_core::SnapshotArtifact`], publishes it, and records the fact;
//! - [`SnapshotExporter`] consumes published snapshots and archives each as
//!   one blob;
//! - [`restore_snapshot`] puts an archived snapshot back into the document
//!   store.
//!
//! Every component is constructed with the store handles it uses; nothing is
//! global. Writes that fail are retried with jittered backoff and then written
//! to the dead-letter journal.

pub mod backends;
pub mod dead_letter;
pub mod error;
pub mod export;
pub mod ingest;
pub mod restore;
pub mod retry;
pub mod snapshot;
pub mod stats;

pub use backends::{ArchiveSink, AuditSink, DocumentSource, LazyDocuments};
pub use dead_letter::{DeadLetter, DeadLetterStage, DeadLetterWriter};
pub use error::{DeadLetterError, ExportError, RestoreError, SnapshotError};
pub use export::{ExportOutcome, SnapshotExporter};
pub use ingest::{IngestOutcome, IngestionPipeline};
pub use restore::{RestoreReport, restore_snapshot};
pub use retry::RetryPolicy;
pub use snapshot::{
    SnapshotBuilder, SnapshotHandle, SnapshotRequest, SnapshotWorker, TriggerOutcome,
    snapshot_channel,
};
pub use stats::{ExportCounts, ExportStats, IngestCounts, IngestStats};
