use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{EntityKind, EventKind};

/// One normalized change event, ready to be appended to the audit log.
///
/// Group/task identifiers are already aliased from the entity identifier
/// (see [`ChangeEvent::normalize_ids`]); downstream queries key on them.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[schemars(with = "String")]
    pub event_type: EventKind,
    #[schemars(with = "String")]
    pub entity: EntityKind,
    pub entity_id: String,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub changes: String,
    pub user: String,
    pub workspace: String,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Alias the entity identifier into the group or task identifier.
    ///
    /// A `Group` event is always about group `entity_id`, and a `Task` event
    /// about task `entity_id`, whatever the payload claimed. Other entity
    /// kinds keep the identifiers they were sent with.
    pub fn normalize_ids(&mut self) {
        match self.entity {
            EntityKind::Group => self.group_id = Some(self.entity_id.clone()),
            EntityKind::Task => self.task_id = Some(self.entity_id.clone()),
            _ => {}
        }
    }

    /// The audit entry describing a published snapshot.
    #[must_use]
    pub fn snapshot_created(
        snapshot_id: &str,
        summary: String,
        user: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: EventKind::SnapshotCreated,
            entity: EntityKind::System,
            entity_id: snapshot_id.to_string(),
            group_id: None,
            group_name: None,
            task_id: None,
            task_name: None,
            changes: summary,
            user: user.to_string(),
            workspace: "system".to_string(),
            timestamp: created_at,
        }
    }

    /// Short human description for log lines.
    #[must_use]
    pub fn display_message(&self) -> String {
        if self.changes.is_empty() {
            format!("{} operation on {}", self.event_type, self.entity)
        } else {
            self.changes.clone()
        }
    }
}
