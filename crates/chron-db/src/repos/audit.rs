//! Audit log appends and history queries.
//!
//! Every query returns records newest first: `timestamp` descending, then
//! `seq` descending for records that share a timestamp.

use chrono::{SubsecRound, Utc};
use chron_core::time::{partition_day, to_storage_string};
use chron_core::{AuditLogRecord, ChangeEvent};

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, get_string_or_empty, non_empty, parse_datetime};
use crate::store::AuditLogStore;

const RECORD_COLUMNS: &str = "seq, timestamp, event_type, entity, entity_id, group_id, group_name, \
     task_id, task_name, changes, user_name, workspace, recorded_at";

impl AuditLogStore {
    /// Append one change event and return the stored record.
    ///
    /// Timestamps are kept to the microsecond, so the returned record equals
    /// what a later read yields.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn append(&self, event: &ChangeEvent) -> Result<AuditLogRecord, DatabaseError> {
        let recorded_at = Utc::now().trunc_subsecs(6);
        let mut event = event.clone();
        event.timestamp = event.timestamp.trunc_subsecs(6);
        let timestamp = to_storage_string(&event.timestamp);
        let day = partition_day(&event.timestamp);
        let recorded = to_storage_string(&recorded_at);

        let mut rows = self
            .db()
            .conn()
            .query(
                "INSERT INTO change_event_logs (timestamp, partition_day, event_type, entity, entity_id,
                     group_id, group_name, task_id, task_name, changes, user_name, workspace, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 RETURNING seq",
                libsql::params![
                    timestamp.as_str(),
                    day.as_str(),
                    event.event_type.as_str(),
                    event.entity.as_str(),
                    event.entity_id.as_str(),
                    event.group_id.as_deref(),
                    event.group_name.as_deref(),
                    event.task_id.as_deref(),
                    event.task_name.as_deref(),
                    non_empty(&event.changes),
                    non_empty(&event.user),
                    non_empty(&event.workspace),
                    recorded.as_str()
                ],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let seq = row.get::<i64>(0)?;

        tracing::debug!(seq, event_type = %event.event_type, entity_id = %event.entity_id, "audit record appended");

        Ok(AuditLogRecord {
            seq,
            recorded_at,
            event,
        })
    }

    /// History of one group, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_by_group(
        &self,
        group_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AuditLogRecord>, DatabaseError> {
        self.fetch_records(
            "WHERE group_id = ?1",
            vec![libsql::Value::Text(group_id.to_string())],
            limit,
        )
        .await
    }

    /// History of one task, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_by_task(
        &self,
        task_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AuditLogRecord>, DatabaseError> {
        self.fetch_records(
            "WHERE task_id = ?1",
            vec![libsql::Value::Text(task_id.to_string())],
            limit,
        )
        .await
    }

    /// History of any entity by kind and identifier, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_by_entity(
        &self,
        entity: &str,
        entity_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AuditLogRecord>, DatabaseError> {
        self.fetch_records(
            "WHERE entity = ?1 AND entity_id = ?2",
            vec![
                libsql::Value::Text(entity.to_string()),
                libsql::Value::Text(entity_id.to_string()),
            ],
            limit,
        )
        .await
    }

    /// The most recent records across the whole log.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn recent(&self, limit: Option<u32>) -> Result<Vec<AuditLogRecord>, DatabaseError> {
        self.fetch_records("", Vec::new(), limit).await
    }

    /// Total number of stored records.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT COUNT(*) FROM change_event_logs", ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        crate::helpers::get_count(&row, 0)
    }

    async fn fetch_records(
        &self,
        where_clause: &str,
        params: Vec<libsql::Value>,
        limit: Option<u32>,
    ) -> Result<Vec<AuditLogRecord>, DatabaseError> {
        let limit = self.effective_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM change_event_logs {where_clause}
             ORDER BY timestamp DESC, seq DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            match record_from_row(&row) {
                Ok(record) => records.push(record),
                Err(error) => tracing::warn!(%error, "skipping unreadable audit record"),
            }
        }
        Ok(records)
    }
}

fn record_from_row(row: &libsql::Row) -> Result<AuditLogRecord, DatabaseError> {
    Ok(AuditLogRecord {
        seq: row.get::<i64>(0)?,
        event: ChangeEvent {
            timestamp: parse_datetime(&row.get::<String>(1)?)?,
            event_type: row.get::<String>(2)?.into(),
            entity: row.get::<String>(3)?.into(),
            entity_id: row.get::<String>(4)?,
            group_id: get_opt_string(row, 5)?,
            group_name: get_opt_string(row, 6)?,
            task_id: get_opt_string(row, 7)?,
            task_name: get_opt_string(row, 8)?,
            changes: get_string_or_empty(row, 9)?,
            user: get_string_or_empty(row, 10)?,
            workspace: get_string_or_empty(row, 11)?,
        },
        recorded_at: parse_datetime(&row.get::<String>(12)?)?,
    })
}
