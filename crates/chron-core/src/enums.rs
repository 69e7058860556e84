//! Event kinds, entity kinds, and document collections for Chronicle.
//!
//! Event and entity kinds are open enums: the producer owns the vocabulary, so
//! values this crate does not know are carried verbatim in `Other` instead of
//! failing the decode. Both serialize as their wire string.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// What happened to the entity, as named by the producer's `eventType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    StatusChanged,
    CommentAdded,
    /// Requests a full snapshot instead of an audit insert.
    SnapshotTrigger,
    /// Written by the snapshot builder once a snapshot has been published.
    SnapshotCreated,
    Other(String),
}

impl EventKind {
    /// Return the wire representation (also the stored `event_type` column).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GroupCreated => "GROUP_CREATED",
            Self::GroupUpdated => "GROUP_UPDATED",
            Self::GroupDeleted => "GROUP_DELETED",
            Self::TaskCreated => "TASK_CREATED",
            Self::TaskUpdated => "TASK_UPDATED",
            Self::TaskDeleted => "TASK_DELETED",
            Self::StatusChanged => "STATUS_CHANGED",
            Self::CommentAdded => "COMMENT_ADDED",
            Self::SnapshotTrigger => "SNAPSHOT_TRIGGER",
            Self::SnapshotCreated => "SNAPSHOT_CREATED",
            Self::Other(raw) => raw,
        }
    }

    #[must_use]
    pub const fn is_snapshot_trigger(&self) -> bool {
        matches!(self, Self::SnapshotTrigger)
    }
}

impl From<&str> for EventKind {
    fn from(raw: &str) -> Self {
        match raw {
            "GROUP_CREATED" => Self::GroupCreated,
            "GROUP_UPDATED" => Self::GroupUpdated,
            "GROUP_DELETED" => Self::GroupDeleted,
            "TASK_CREATED" => Self::TaskCreated,
            "TASK_UPDATED" => Self::TaskUpdated,
            "TASK_DELETED" => Self::TaskDeleted,
            "STATUS_CHANGED" => Self::StatusChanged,
            "COMMENT_ADDED" => Self::CommentAdded,
            "SNAPSHOT_TRIGGER" => Self::SnapshotTrigger,
            "SNAPSHOT_CREATED" => Self::SnapshotCreated,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The kind of entity an event is about, from `payload.entity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    Group,
    Task,
    Comment,
    /// Records written by the pipeline itself (snapshot completion).
    System,
    Other(String),
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Group => "Group",
            Self::Task => "Task",
            Self::Comment => "Comment",
            Self::System => "SYSTEM",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for EntityKind {
    fn from(raw: &str) -> Self {
        match raw {
            "Group" => Self::Group,
            "Task" => Self::Task,
            "Comment" => Self::Comment,
            "SYSTEM" => Self::System,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EntityKind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// The four document-store collections captured by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Groups,
    Tasks,
    Comments,
    Users,
}

impl Collection {
    /// Capture order used by the snapshot builder.
    pub const ALL: [Self; 4] = [Self::Groups, Self::Tasks, Self::Comments, Self::Users];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::Tasks => "tasks",
            Self::Comments => "comments",
            Self::Users => "users",
        }
    }

    /// Whether this collection holds application records.
    ///
    /// Users alone do not make a snapshot meaningful: a capture where every
    /// record-bearing collection is empty is rejected.
    #[must_use]
    pub const fn is_record_bearing(self) -> bool {
        !matches!(self, Self::Users)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
