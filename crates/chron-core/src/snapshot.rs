//! The snapshot artifact: a denormalized copy of the document store.
//!
//! Documents are carried as opaque JSON values. The artifact never interprets
//! them beyond counting; consumers of archived snapshots own the schema of each
//! collection.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::Collection;

/// Current artifact format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const fn default_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

/// Snapshot identifier for a creation instant: `snapshot_YYYY_MM_DD_HH_MM_SS` (UTC).
#[must_use]
pub fn snapshot_id_for(created_at: &DateTime<Utc>) -> String {
    created_at.format("snapshot_%Y_%m_%d_%H_%M_%S").to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SnapshotData {
    #[serde(default)]
    pub groups: Vec<Value>,
    #[serde(default)]
    pub tasks: Vec<Value>,
    #[serde(default)]
    pub comments: Vec<Value>,
    #[serde(default)]
    pub users: Vec<Value>,
}

impl SnapshotData {
    #[must_use]
    pub fn collection(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Groups => &self.groups,
            Collection::Tasks => &self.tasks,
            Collection::Comments => &self.comments,
            Collection::Users => &self.users,
        }
    }

    pub fn set_collection(&mut self, collection: Collection, documents: Vec<Value>) {
        match collection {
            Collection::Groups => self.groups = documents,
            Collection::Tasks => self.tasks = documents,
            Collection::Comments => self.comments = documents,
            Collection::Users => self.users = documents,
        }
    }

    /// True when every record-bearing collection is empty.
    #[must_use]
    pub fn is_empty_capture(&self) -> bool {
        Collection::ALL
            .into_iter()
            .filter(|c| c.is_record_bearing())
            .all(|c| self.collection(c).is_empty())
    }

    #[must_use]
    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            groups: self.groups.len(),
            tasks: self.tasks.len(),
            comments: self.comments.len(),
            users: self.users.len(),
        }
    }
}

/// Cardinality of each collection at capture time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SnapshotCounts {
    pub groups: usize,
    pub tasks: usize,
    pub comments: usize,
    pub users: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SnapshotMetadata {
    pub counts: SnapshotCounts,
}

/// A full point-in-time capture of the document store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotArtifact {
    pub snapshot_id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub data: SnapshotData,
    pub metadata: SnapshotMetadata,
}

impl SnapshotArtifact {
    /// Assemble an artifact, deriving its identifier and counts.
    ///
    /// Does not enforce the empty-capture rule; the builder does that before
    /// anything is published.
    #[must_use]
    pub fn new(created_at: DateTime<Utc>, created_by: &str, data: SnapshotData) -> Self {
        let counts = data.counts();
        Self {
            snapshot_id: snapshot_id_for(&created_at),
            version: SNAPSHOT_FORMAT_VERSION,
            created_at,
            created_by: created_by.to_string(),
            data,
            metadata: SnapshotMetadata { counts },
        }
    }

    /// Canonical byte form: pretty JSON with two-space indentation.
    ///
    /// Document object keys come out sorted because `serde_json::Map` is
    /// ordered, so the same capture always serializes to the same bytes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if a document cannot be serialized.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Decode an artifact from its JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the bytes are not a snapshot artifact.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Whether the recorded counts match the collections actually carried.
    #[must_use]
    pub fn counts_consistent(&self) -> bool {
        self.metadata.counts == self.data.counts()
    }

    /// Change description written to the audit log on completion.
    #[must_use]
    pub fn change_summary(&self) -> String {
        let c = self.metadata.counts;
        format!(
            "Snapshot created with {} groups, {} tasks, {} comments, {} users - Reference: {}",
            c.groups, c.tasks, c.comments, c.users, self.snapshot_id
        )
    }
}
