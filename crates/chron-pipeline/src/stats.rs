//! Per-loop counters.
//!
//! Shared as `Arc`s so the binary can report them while the loops run.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    stored: AtomicU64,
    skipped: AtomicU64,
    dead_lettered: AtomicU64,
    snapshot_triggers: AtomicU64,
    snapshot_triggers_dropped: AtomicU64,
    read_errors: AtomicU64,
    commit_errors: AtomicU64,
    uncommitted: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestCounts {
    pub received: u64,
    pub stored: u64,
    pub skipped: u64,
    pub dead_lettered: u64,
    pub snapshot_triggers: u64,
    pub snapshot_triggers_dropped: u64,
    pub read_errors: u64,
    pub commit_errors: u64,
    pub uncommitted: u64,
}

impl IngestStats {
    pub(crate) fn received(&self) {
        bump(&self.received);
    }
    pub(crate) fn stored(&self) {
        bump(&self.stored);
    }
    pub(crate) fn skipped(&self) {
        bump(&self.skipped);
    }
    pub(crate) fn dead_lettered(&self) {
        bump(&self.dead_lettered);
    }
    pub(crate) fn snapshot_trigger(&self) {
        bump(&self.snapshot_triggers);
    }
    pub(crate) fn snapshot_trigger_dropped(&self) {
        bump(&self.snapshot_triggers_dropped);
    }
    pub(crate) fn read_error(&self) {
        bump(&self.read_errors);
    }
    pub(crate) fn commit_error(&self) {
        bump(&self.commit_errors);
    }
    pub(crate) fn uncommitted(&self) {
        bump(&self.uncommitted);
    }

    #[must_use]
    pub fn counts(&self) -> IngestCounts {
        IngestCounts {
            received: read(&self.received),
            stored: read(&self.stored),
            skipped: read(&self.skipped),
            dead_lettered: read(&self.dead_lettered),
            snapshot_triggers: read(&self.snapshot_triggers),
            snapshot_triggers_dropped: read(&self.snapshot_triggers_dropped),
            read_errors: read(&self.read_errors),
            commit_errors: read(&self.commit_errors),
            uncommitted: read(&self.uncommitted),
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportStats {
    received: AtomicU64,
    exported: AtomicU64,
    already_exported: AtomicU64,
    skipped: AtomicU64,
    dead_lettered: AtomicU64,
    read_errors: AtomicU64,
    commit_errors: AtomicU64,
    uncommitted: AtomicU64,
}

/// Point-in-time copy of [`ExportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCounts {
    pub received: u64,
    pub exported: u64,
    pub already_exported: u64,
    pub skipped: u64,
    pub dead_lettered: u64,
    pub read_errors: u64,
    pub commit_errors: u64,
    pub uncommitted: u64,
}

impl ExportStats {
    pub(crate) fn received(&self) {
        bump(&self.received);
    }
    pub(crate) fn exported(&self) {
        bump(&self.exported);
    }
    pub(crate) fn already_exported(&self) {
        bump(&self.already_exported);
    }
    pub(crate) fn skipped(&self) {
        bump(&self.skipped);
    }
    pub(crate) fn dead_lettered(&self) {
        bump(&self.dead_lettered);
    }
    pub(crate) fn read_error(&self) {
        bump(&self.read_errors);
    }
    pub(crate) fn commit_error(&self) {
        bump(&self.commit_errors);
    }
    pub(crate) fn uncommitted(&self) {
        bump(&self.uncommitted);
    }

    #[must_use]
    pub fn counts(&self) -> ExportCounts {
        ExportCounts {
            received: read(&self.received),
            exported: read(&self.exported),
            already_exported: read(&self.already_exported),
            skipped: read(&self.skipped),
            dead_lettered: read(&self.dead_lettered),
            read_errors: read(&self.read_errors),
            commit_errors: read(&self.commit_errors),
            uncommitted: read(&self.uncommitted),
        }
    }
}
