//! Configuration loading and store opening for command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use chron_config::ChronicleConfig;
use chron_db::AuditLogStore;
use chron_lake::SnapshotArchive;
use chron_pipeline::DeadLetterWriter;
use chron_queue::{QueueBroker, TransportError};

use crate::cli::GlobalFlags;

pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<ChronicleConfig> {
    ChronicleConfig::load_with_dotenv(flags.config.as_deref())
        .context("failed to load chronicle configuration")
}

/// Open the audit log. Failure here is the one fatal startup error.
pub async fn open_audit(config: &ChronicleConfig) -> anyhow::Result<Arc<AuditLogStore>> {
    let store = AuditLogStore::open(&config.audit, config.pipeline.query_limit)
        .await
        .with_context(|| format!("failed to open audit log at {}", config.audit.location()))?;
    Ok(Arc::new(store))
}

/// Open the queue store, retrying transport failures with a fixed backoff.
pub async fn open_broker(config: &ChronicleConfig) -> anyhow::Result<QueueBroker> {
    let backoff = Duration::from_millis(config.queue.read_backoff_ms);
    loop {
        match QueueBroker::open(&config.queue).await {
            Ok(broker) => return Ok(broker),
            Err(TransportError::NotConfigured) => {
                anyhow::bail!("queue store is not configured (set queue.store.path or queue.store.url)")
            }
            Err(error) => {
                tracing::warn!(
                    location = config.queue.store.location(),
                    %error,
                    "queue store unavailable, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

pub fn open_archive(config: &ChronicleConfig) -> anyhow::Result<Arc<SnapshotArchive>> {
    let archive = SnapshotArchive::open(&config.blob).context("failed to open snapshot archive")?;
    Ok(Arc::new(archive))
}

/// The dead-letter journal, or a disabled writer if its directory cannot be
/// created. Messages that would have been journaled are then held instead.
pub fn dead_letters(config: &ChronicleConfig) -> DeadLetterWriter {
    let dir = PathBuf::from(&config.pipeline.dead_letter_dir);
    match DeadLetterWriter::new(dir) {
        Ok(writer) => writer,
        Err(error) => {
            tracing::error!(
                dir = %config.pipeline.dead_letter_dir,
                %error,
                "dead-letter journal unavailable"
            );
            DeadLetterWriter::disabled()
        }
    }
}
