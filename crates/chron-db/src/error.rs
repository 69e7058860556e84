//! Database error types for chron-db.

use thiserror::Error;

/// Errors from audit log and document store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned unusable data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// The database location is missing from the configuration.
    #[error("Database not configured: {0}")]
    NotConfigured(String),

    /// A stored document is not valid JSON.
    #[error("Invalid document {collection}/{doc_id}: {source}")]
    InvalidDocument {
        collection: String,
        doc_id: String,
        source: serde_json::Error,
    },

    /// Could not prepare the directory for a local database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

/// SQLite primary result code for constraint violations.
const SQLITE_CONSTRAINT: i32 = 19;

impl DatabaseError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Configuration, migration, malformed documents, and constraint
    /// violations fail the same way every time.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Migration(_) | Self::NotConfigured(_) | Self::InvalidDocument { .. } => false,
            Self::LibSql(libsql::Error::SqliteFailure(code, _)) => {
                code & 0xff != SQLITE_CONSTRAINT
            }
            Self::Query(_) | Self::NoResult | Self::Io(_) | Self::LibSql(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_hiccups_are_transient() {
        assert!(DatabaseError::Query("database is locked".into()).is_transient());
        assert!(DatabaseError::NoResult.is_transient());
        assert!(DatabaseError::Io(std::io::Error::other("reset")).is_transient());
        assert!(DatabaseError::LibSql(libsql::Error::SqliteFailure(5, "busy".into())).is_transient());
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        assert!(!DatabaseError::NotConfigured("audit".into()).is_transient());
        assert!(!DatabaseError::Migration("bad ddl".into()).is_transient());
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(
            !DatabaseError::InvalidDocument {
                collection: "groups".into(),
                doc_id: "g-1".into(),
                source,
            }
            .is_transient()
        );
        // SQLITE_CONSTRAINT_TRIGGER, raised by the append-only guard.
        assert!(
            !DatabaseError::LibSql(libsql::Error::SqliteFailure(1811, "append-only".into()))
                .is_transient()
        );
    }
}
