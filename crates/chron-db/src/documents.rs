//! The document store of record.
//!
//! Each collection is a set of JSON documents keyed by `doc_id`. Chronicle
//! reads it whole for snapshots and writes it whole on restore; `upsert` exists
//! for seeding and the producer side.

use chron_config::DatabaseConfig;
use chron_core::{Collection, SnapshotCounts, SnapshotData};
use libsql::Builder;
use serde_json::Value;

use crate::error::DatabaseError;
use crate::{configure_local, ensure_parent_dir};

pub struct DocumentDb {
    #[allow(dead_code)]
    db: libsql::Database,
    pub(crate) conn: libsql::Connection,
}

impl DocumentDb {
    /// Open a local document database. Creates the table if missing.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        configure_local(&conn, path).await?;

        let doc_db = Self { db, conn };
        doc_db.run_migrations().await?;
        Ok(doc_db)
    }

    /// Open a remote document database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection fails.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        let conn = db.connect()?;

        let doc_db = Self { db, conn };
        doc_db.run_migrations().await?;
        Ok(doc_db)
    }

    /// Open whichever location the config names.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotConfigured` when neither a path nor a URL is set.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if !config.is_configured() {
            return Err(DatabaseError::NotConfigured("documents".into()));
        }
        if config.is_remote() {
            Self::open_remote(&config.url, &config.auth_token).await
        } else {
            ensure_parent_dir(&config.path)?;
            Self::open_local(&config.path).await
        }
    }

    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Round-trip a trivial query to confirm the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the store does not answer.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        let mut rows = self.conn.query("SELECT 1", ()).await?;
        rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(())
    }

    /// Every document in a collection, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidDocument` if a stored body is not JSON,
    /// or a libSQL error if the read fails.
    pub async fn read_collection(&self, collection: Collection) -> Result<Vec<Value>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT doc_id, body FROM documents WHERE collection = ?1 ORDER BY doc_id",
                [collection.as_str()],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let doc_id = row.get::<String>(0)?;
            let body = row.get::<String>(1)?;
            let value = serde_json::from_str(&body).map_err(|source| {
                DatabaseError::InvalidDocument {
                    collection: collection.as_str().to_string(),
                    doc_id,
                    source,
                }
            })?;
            documents.push(value);
        }
        Ok(documents)
    }

    /// Insert or replace one document.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn upsert(
        &self,
        collection: Collection,
        doc_id: &str,
        body: &Value,
    ) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)
                 ON CONFLICT (collection, doc_id) DO UPDATE SET body = excluded.body",
                libsql::params![collection.as_str(), doc_id, body.to_string()],
            )
            .await?;
        Ok(())
    }

    /// Replace every collection with the documents of a captured snapshot.
    ///
    /// Runs in one transaction: either all four collections hold the snapshot
    /// afterwards or none changed. A document's id is its `_id` field, or its
    /// position in the capture when it has none.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any delete or insert fails.
    pub async fn restore(&self, data: &SnapshotData) -> Result<SnapshotCounts, DatabaseError> {
        let tx = self.conn.transaction().await?;
        for collection in Collection::ALL {
            tx.execute(
                "DELETE FROM documents WHERE collection = ?1",
                [collection.as_str()],
            )
            .await?;
            for (index, body) in data.collection(collection).iter().enumerate() {
                tx.execute(
                    "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)
                     ON CONFLICT (collection, doc_id) DO UPDATE SET body = excluded.body",
                    libsql::params![
                        collection.as_str(),
                        document_id(body, index),
                        body.to_string()
                    ],
                )
                .await?;
            }
        }
        tx.commit().await?;
        Ok(data.counts())
    }

    /// Number of documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count(&self, collection: Collection) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                [collection.as_str()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        crate::helpers::get_count(&row, 0)
    }
}

/// The key a restored document is stored under.
fn document_id(body: &Value, index: usize) -> String {
    match body.get("_id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Object(oid)) => match oid.get("$oid") {
            Some(Value::String(id)) => id.clone(),
            _ => format!("{index:08}"),
        },
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("{index:08}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn read_collection_returns_documents_in_id_order() {
        let db = DocumentDb::open_local(":memory:").await.unwrap();
        db.upsert(Collection::Tasks, "t-2", &json!({"_id": "t-2", "title": "Laundry"}))
            .await
            .unwrap();
        db.upsert(Collection::Tasks, "t-1", &json!({"_id": "t-1", "title": "Dishes"}))
            .await
            .unwrap();
        db.upsert(Collection::Groups, "g-1", &json!({"_id": "g-1"}))
            .await
            .unwrap();

        let tasks = db.read_collection(Collection::Tasks).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["_id"], "t-1");
        assert_eq!(db.count(Collection::Groups).await.unwrap(), 1);
        assert!(db.read_collection(Collection::Comments).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_body() {
        let db = DocumentDb::open_local(":memory:").await.unwrap();
        db.upsert(Collection::Users, "u-1", &json!({"name": "ann"}))
            .await
            .unwrap();
        db.upsert(Collection::Users, "u-1", &json!({"name": "bea"}))
            .await
            .unwrap();
        let users = db.read_collection(Collection::Users).await.unwrap();
        assert_eq!(users, vec![json!({"name": "bea"})]);
    }

    #[tokio::test]
    async fn restore_replaces_every_collection() {
        let db = DocumentDb::open_local(":memory:").await.unwrap();
        db.upsert(Collection::Tasks, "t-9", &json!({"_id": "t-9", "title": "Stale"}))
            .await
            .unwrap();
        db.upsert(Collection::Users, "u-1", &json!({"name": "ann"}))
            .await
            .unwrap();

        let mut data = SnapshotData::default();
        data.set_collection(
            Collection::Tasks,
            vec![
                json!({"_id": "t-1", "title": "Dishes"}),
                json!({"_id": {"$oid": "t-2"}, "title": "Laundry"}),
            ],
        );
        data.set_collection(Collection::Groups, vec![json!({"name": "no id"})]);

        let counts = db.restore(&data).await.unwrap();
        assert_eq!(counts.tasks, 2);
        assert_eq!(counts.groups, 1);
        assert_eq!(counts.users, 0);

        let tasks = db.read_collection(Collection::Tasks).await.unwrap();
        assert_eq!(tasks, data.tasks);
        assert_eq!(
            db.read_collection(Collection::Groups).await.unwrap(),
            vec![json!({"name": "no id"})]
        );
        assert_eq!(db.count(Collection::Users).await.unwrap(), 0);
    }

    #[test]
    fn document_id_prefers_the_body_id() {
        assert_eq!(document_id(&json!({"_id": "g-1"}), 3), "g-1");
        assert_eq!(document_id(&json!({"_id": {"$oid": "abc"}}), 3), "abc");
        assert_eq!(document_id(&json!({"_id": 7}), 3), "7");
        assert_eq!(document_id(&json!({"name": "x"}), 3), "00000003");
    }

    #[tokio::test]
    async fn corrupt_body_is_an_error() {
        let db = DocumentDb::open_local(":memory:").await.unwrap();
        db.conn()
            .execute(
                "INSERT INTO documents (collection, doc_id, body) VALUES ('groups', 'g-1', '{broken')",
                (),
            )
            .await
            .unwrap();
        let err = db.read_collection(Collection::Groups).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidDocument { .. }));
    }
}
