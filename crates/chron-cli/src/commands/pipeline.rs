//! `chronicle run`, `chronicle ingest`, and `chronicle export`.
//!
//! Each loop owns its own subscription. They share the audit store handle
//! and nothing mutable. Ctrl+C is the only way to stop them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;

use chron_config::ChronicleConfig;
use chron_pipeline::{
    ArchiveSink, AuditSink, DocumentSource, IngestionPipeline, LazyDocuments, RetryPolicy,
    SnapshotBuilder, SnapshotExporter, SnapshotWorker, snapshot_channel,
};
use chron_queue::{Publisher, QueueBroker, TopicConsumer};

use crate::bootstrap;

/// Ingestion, the snapshot worker, and the exporter side by side.
pub async fn run_all(config: &ChronicleConfig) -> anyhow::Result<()> {
    let audit: Arc<dyn AuditSink> = bootstrap::open_audit(config).await?;
    let archive: Arc<dyn ArchiveSink> = bootstrap::open_archive(config)?;
    let broker = bootstrap::open_broker(config).await?;

    let (ingest, worker) = ingestion(config, &broker, audit).await;
    let exporter = exporter(config, &broker, archive).await;
    let ingest_stats = ingest.stats();
    let export_stats = exporter.stats();

    let worker = worker.spawn();
    let mut ingest = tokio::spawn(ingest.run());
    let mut export = tokio::spawn(exporter.run());

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
        _ = &mut ingest => tracing::warn!("ingestion loop exited"),
        _ = &mut export => tracing::warn!("snapshot exporter exited"),
    }

    tracing::info!(
        ingest = ?ingest_stats.counts(),
        export = ?export_stats.counts(),
        "shutting down"
    );
    stop([ingest, export, worker]);
    Ok(())
}

/// Ingestion and its snapshot worker only.
pub async fn run_ingest(config: &ChronicleConfig) -> anyhow::Result<()> {
    let audit: Arc<dyn AuditSink> = bootstrap::open_audit(config).await?;
    let broker = bootstrap::open_broker(config).await?;

    let (ingest, worker) = ingestion(config, &broker, audit).await;
    let stats = ingest.stats();
    let worker = worker.spawn();
    let mut ingest = tokio::spawn(ingest.run());

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
        _ = &mut ingest => tracing::warn!("ingestion loop exited"),
    }

    tracing::info!(counts = ?stats.counts(), "shutting down");
    stop([ingest, worker]);
    Ok(())
}

/// The snapshot exporter only.
pub async fn run_export(config: &ChronicleConfig) -> anyhow::Result<()> {
    let archive: Arc<dyn ArchiveSink> = bootstrap::open_archive(config)?;
    let broker = bootstrap::open_broker(config).await?;

    let exporter = exporter(config, &broker, archive).await;
    let stats = exporter.stats();
    let mut export = tokio::spawn(exporter.run());

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
        _ = &mut export => tracing::warn!("snapshot exporter exited"),
    }

    tracing::info!(counts = ?stats.counts(), "shutting down");
    stop([export]);
    Ok(())
}

async fn ingestion(
    config: &ChronicleConfig,
    broker: &QueueBroker,
    audit: Arc<dyn AuditSink>,
) -> (IngestionPipeline<TopicConsumer>, SnapshotWorker) {
    let retry = RetryPolicy::from_config(&config.pipeline);
    let documents: Arc<dyn DocumentSource> =
        Arc::new(LazyDocuments::new(config.documents.clone()));
    let publisher: Arc<dyn Publisher> = Arc::new(broker.publisher(&config.queue.snapshots_topic));

    let builder =
        SnapshotBuilder::new(documents, publisher, Arc::clone(&audit)).with_retry(retry.clone());
    let (snapshots, worker) = snapshot_channel(builder, config.pipeline.snapshot_queue_capacity);

    let consumer = subscribe(
        config,
        broker,
        &config.queue.events_topic,
        &config.queue.ingest_group,
    )
    .await;
    let pipeline = IngestionPipeline::new(consumer, audit, snapshots, bootstrap::dead_letters(config))
        .with_retry(retry)
        .with_read_backoff(read_backoff(config));
    (pipeline, worker)
}

async fn exporter(
    config: &ChronicleConfig,
    broker: &QueueBroker,
    archive: Arc<dyn ArchiveSink>,
) -> SnapshotExporter<TopicConsumer> {
    let consumer = subscribe(
        config,
        broker,
        &config.queue.snapshots_topic,
        &config.queue.export_group,
    )
    .await;
    SnapshotExporter::new(consumer, archive, bootstrap::dead_letters(config))
        .with_retry(RetryPolicy::from_config(&config.pipeline))
        .with_read_backoff(read_backoff(config))
}

/// Position a consumer, retrying transport failures with a fixed backoff.
async fn subscribe(
    config: &ChronicleConfig,
    broker: &QueueBroker,
    topic: &str,
    group: &str,
) -> TopicConsumer {
    loop {
        match broker.consumer(topic, group).await {
            Ok(consumer) => {
                tracing::info!(topic, group, position = consumer.position(), "subscribed");
                return consumer;
            }
            Err(error) => {
                tracing::warn!(topic, group, %error, "subscribe failed, retrying");
                tokio::time::sleep(read_backoff(config)).await;
            }
        }
    }
}

const fn read_backoff(config: &ChronicleConfig) -> Duration {
    Duration::from_millis(config.queue.read_backoff_ms)
}

fn stop<const N: usize>(tasks: [JoinHandle<()>; N]) {
    for task in tasks {
        task.abort();
    }
}
