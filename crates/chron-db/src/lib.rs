//! # chron-db
//!
//! libSQL persistence for Chronicle.
//!
//! Two databases live here:
//! - the audit log (`change_event_logs`), append-only and query-optimised for
//!   newest-first history and per-group / per-task activity summaries;
//! - the document store of record (`documents`), read whole by the snapshot
//!   builder.
//!
//! Both open either a local file (`:memory:` works for tests) or a remote
//! Turso database, selected by [`chron_config::DatabaseConfig`].

pub mod documents;
pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod store;

pub use documents::DocumentDb;
pub use error::DatabaseError;
pub use store::AuditLogStore;

use chron_config::DatabaseConfig;
use libsql::Builder;

/// Milliseconds a writer waits on a locked local database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Handle to the audit log database.
///
/// Wraps a libSQL database and one connection. Query methods live on
/// [`AuditLogStore`].
pub struct AuditDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl AuditDb {
    /// Open a local database file. Runs migrations on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        configure_local(&conn, path).await?;

        let audit_db = Self { db, conn };
        audit_db.run_migrations().await?;
        Ok(audit_db)
    }

    /// Open a remote Turso database. Runs migrations on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection or migrations fail.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        let conn = db.connect()?;

        let audit_db = Self { db, conn };
        audit_db.run_migrations().await?;
        Ok(audit_db)
    }

    /// Open whichever location the config names.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotConfigured` when neither a path nor a URL is
    /// set, otherwise see [`Self::open_local`] and [`Self::open_remote`].
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if !config.is_configured() {
            return Err(DatabaseError::NotConfigured("audit".into()));
        }
        if config.is_remote() {
            Self::open_remote(&config.url, &config.auth_token).await
        } else {
            ensure_parent_dir(&config.path)?;
            Self::open_local(&config.path).await
        }
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

/// Create the directory holding a local database file.
pub(crate) fn ensure_parent_dir(path: &str) -> Result<(), DatabaseError> {
    if path == ":memory:" {
        return Ok(());
    }
    match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Per-connection pragmas for local files.
///
/// `PRAGMA` statements that return a row must go through `query`, not
/// `execute`.
pub(crate) async fn configure_local(
    conn: &libsql::Connection,
    path: &str,
) -> Result<(), DatabaseError> {
    conn.query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;
    if path != ":memory:" {
        conn.query("PRAGMA journal_mode = WAL", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA journal_mode: {e}")))?;
    }
    Ok(())
}
