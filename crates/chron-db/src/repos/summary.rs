//! Per-group and per-task activity aggregates.
//!
//! The reported name is the most recent non-empty one logged for the id, so a
//! rename shows up as soon as one event carries the new name.

use chron_core::{GroupSummary, TaskSummary};

use crate::error::DatabaseError;
use crate::helpers::{get_count, get_opt_string, parse_datetime};
use crate::store::AuditLogStore;

impl AuditLogStore {
    /// Activity per group, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn group_summaries(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<GroupSummary>, DatabaseError> {
        let limit = self.effective_limit(limit);
        let sql = format!(
            "SELECT l.group_id,
                    (SELECT n.group_name FROM change_event_logs n
                      WHERE n.group_id = l.group_id AND n.group_name IS NOT NULL AND n.group_name != ''
                      ORDER BY n.timestamp DESC, n.seq DESC LIMIT 1),
                    COUNT(*),
                    MAX(l.timestamp) AS last_activity
             FROM change_event_logs l
             WHERE l.group_id IS NOT NULL
             GROUP BY l.group_id
             ORDER BY last_activity DESC, l.group_id
             LIMIT {limit}"
        );

        let mut rows = self.db().conn().query(&sql, ()).await?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next().await? {
            match group_summary_from_row(&row) {
                Ok(summary) => summaries.push(summary),
                Err(error) => tracing::warn!(%error, "skipping unreadable group summary"),
            }
        }
        Ok(summaries)
    }

    /// Activity per task, most recently active first.
    ///
    /// With `group_id`, only events logged under that group are counted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn task_summaries(
        &self,
        group_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<TaskSummary>, DatabaseError> {
        let limit = self.effective_limit(limit);
        let (filter, params) = match group_id {
            Some(id) => (
                "AND l.group_id = ?1",
                vec![libsql::Value::Text(id.to_string())],
            ),
            None => ("", Vec::new()),
        };
        let sql = format!(
            "SELECT l.task_id,
                    (SELECT n.task_name FROM change_event_logs n
                      WHERE n.task_id = l.task_id AND n.task_name IS NOT NULL AND n.task_name != ''
                      ORDER BY n.timestamp DESC, n.seq DESC LIMIT 1),
                    COUNT(*),
                    MAX(l.timestamp) AS last_activity
             FROM change_event_logs l
             WHERE l.task_id IS NOT NULL {filter}
             GROUP BY l.task_id
             ORDER BY last_activity DESC, l.task_id
             LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next().await? {
            match task_summary_from_row(&row) {
                Ok(summary) => summaries.push(summary),
                Err(error) => tracing::warn!(%error, "skipping unreadable task summary"),
            }
        }
        Ok(summaries)
    }
}

fn group_summary_from_row(row: &libsql::Row) -> Result<GroupSummary, DatabaseError> {
    Ok(GroupSummary {
        group_id: row.get::<String>(0)?,
        group_name: get_opt_string(row, 1)?,
        log_count: get_count(row, 2)?,
        last_activity: parse_datetime(&row.get::<String>(3)?)?,
    })
}

fn task_summary_from_row(row: &libsql::Row) -> Result<TaskSummary, DatabaseError> {
    Ok(TaskSummary {
        task_id: row.get::<String>(0)?,
        task_name: get_opt_string(row, 1)?,
        log_count: get_count(row, 2)?,
        last_activity: parse_datetime(&row.get::<String>(3)?)?,
    })
}
