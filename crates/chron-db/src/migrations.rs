//! Schema migrations, embedded at compile time.
//!
//! All statements use `IF NOT EXISTS`, so re-running on every open is safe.

use crate::error::DatabaseError;
use crate::{AuditDb, DocumentDb};

const AUDIT_001: &str = include_str!("../migrations/001_audit_log.sql");
const DOCUMENTS_001: &str = include_str!("../migrations/001_documents.sql");

impl AuditDb {
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(AUDIT_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_audit_log: {e}")))?;
        Ok(())
    }
}

impl DocumentDb {
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(DOCUMENTS_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_documents: {e}")))?;
        Ok(())
    }
}
