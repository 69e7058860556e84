//! Topic and consumer settings for the libSQL-backed queue.

use serde::{Deserialize, Serialize};

use crate::database::DatabaseConfig;

fn default_events_topic() -> String {
    String::from("todo-history-events")
}

fn default_snapshots_topic() -> String {
    String::from("todo-snapshots")
}

fn default_ingest_group() -> String {
    String::from("chronicle-ingest")
}

fn default_export_group() -> String {
    String::from("chronicle-export")
}

/// Delay between polls when a topic has no new messages.
const fn default_poll_interval_ms() -> u64 {
    250
}

/// Fixed wait after a failed read before trying again.
const fn default_read_backoff_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Database holding topic messages and committed offsets.
    #[serde(default = "DatabaseConfig::queue_default")]
    pub store: DatabaseConfig,

    /// Topic the producer writes change events to.
    #[serde(default = "default_events_topic")]
    pub events_topic: String,

    /// Topic snapshot artifacts are published to.
    #[serde(default = "default_snapshots_topic")]
    pub snapshots_topic: String,

    /// Consumer group of the ingestion loop.
    #[serde(default = "default_ingest_group")]
    pub ingest_group: String,

    /// Consumer group of the snapshot exporter.
    #[serde(default = "default_export_group")]
    pub export_group: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_read_backoff_ms")]
    pub read_backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            store: DatabaseConfig::queue_default(),
            events_topic: default_events_topic(),
            snapshots_topic: default_snapshots_topic(),
            ingest_group: default_ingest_group(),
            export_group: default_export_group(),
            poll_interval_ms: default_poll_interval_ms(),
            read_backoff_ms: default_read_backoff_ms(),
        }
    }
}
