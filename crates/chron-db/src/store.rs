//! The audit log store.
//!
//! `AuditLogStore` owns the database handle and the result cap. Repository
//! methods are `impl AuditLogStore` blocks in `repos/*.rs`.

use chron_config::DatabaseConfig;

use crate::AuditDb;
use crate::error::DatabaseError;

/// Append-only history of change events, queryable by group, task, or entity.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct AuditLogStore {
    db: AuditDb,
    max_limit: u32,
}

impl AuditLogStore {
    /// Result cap used when the caller does not configure one.
    pub const DEFAULT_LIMIT: u32 = 100;

    /// Open the store at the configured location.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open(config: &DatabaseConfig, max_limit: u32) -> Result<Self, DatabaseError> {
        let db = AuditDb::open(config).await?;
        tracing::info!(location = config.location(), "audit log store ready");
        Ok(Self::from_db(db, max_limit))
    }

    /// Open a local store with the default result cap.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Ok(Self::from_db(AuditDb::open_local(path).await?, Self::DEFAULT_LIMIT))
    }

    #[must_use]
    pub fn from_db(db: AuditDb, max_limit: u32) -> Self {
        Self {
            db,
            max_limit: max_limit.max(1),
        }
    }

    #[must_use]
    pub const fn db(&self) -> &AuditDb {
        &self.db
    }

    #[must_use]
    pub const fn max_limit(&self) -> u32 {
        self.max_limit
    }

    /// The number of rows a query may return: the request, capped.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<u32>) -> u32 {
        requested.map_or(self.max_limit, |n| n.min(self.max_limit))
    }
}
