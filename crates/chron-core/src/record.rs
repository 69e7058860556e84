use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::ChangeEvent;

/// A change event as stored in the audit log.
///
/// Immutable once written. `seq` is assigned by the store and breaks ties
/// between records with the same `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogRecord {
    pub seq: i64,
    /// Wall-clock time the store accepted the record.
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ChangeEvent,
}

/// Activity aggregate for one group.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    /// Most recent non-empty name seen for the group.
    pub group_name: Option<String>,
    pub log_count: u64,
    pub last_activity: DateTime<Utc>,
}

/// Activity aggregate for one task.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub task_id: String,
    pub task_name: Option<String>,
    pub log_count: u64,
    pub last_activity: DateTime<Utc>,
}
