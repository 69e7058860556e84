use thiserror::Error;

/// Errors from publishing to or consuming from a topic.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Queue store not configured")]
    NotConfigured,

    #[error("Queue migration failed: {0}")]
    Migration(String),

    #[error("Queue store returned no row")]
    NoResult,

    /// The transport has shut down and will deliver nothing more.
    #[error("Transport closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}
