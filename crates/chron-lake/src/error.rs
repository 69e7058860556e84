//! Archive error types.

/// Errors from the snapshot archive.
#[derive(Debug, thiserror::Error)]
pub enum LakeError {
    /// Object storage operation failed.
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// No archived artifact has this identifier.
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// The object under a snapshot's key holds a different snapshot.
    #[error("Snapshot id mismatch: requested {requested}, found {found}")]
    IdMismatch {
        /// Identifier the caller asked for.
        requested: String,
        /// Identifier recorded inside the artifact.
        found: String,
    },

    /// The stored object is not a snapshot artifact.
    #[error("Invalid artifact at {key}: {source}")]
    InvalidArtifact {
        key: String,
        source: serde_json::Error,
    },

    /// I/O error preparing a local archive directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LakeError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Object store failures other than missing objects, conflicts, auth
    /// failures, and unsupported operations count as transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::ObjectStore(e) => !matches!(
                e,
                object_store::Error::NotFound { .. }
                    | object_store::Error::AlreadyExists { .. }
                    | object_store::Error::Precondition { .. }
                    | object_store::Error::NotSupported { .. }
                    | object_store::Error::NotImplemented
                    | object_store::Error::InvalidPath { .. }
                    | object_store::Error::PermissionDenied { .. }
                    | object_store::Error::Unauthenticated { .. }
                    | object_store::Error::UnknownConfigurationKey { .. }
            ),
            Self::Io(_) => true,
            Self::SnapshotNotFound(_) | Self::IdMismatch { .. } | Self::InvalidArtifact { .. } => {
                false
            }
        }
    }
}
