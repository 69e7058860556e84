//! libSQL database location shared by the audit, document, and queue stores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Local database file, or `:memory:`. Used when `url` is empty.
    #[serde(default)]
    pub path: String,

    /// Remote database URL (e.g., `libsql://history.turso.io`).
    #[serde(default)]
    pub url: String,

    /// Auth token for the remote database.
    #[serde(default)]
    pub auth_token: String,
}

impl DatabaseConfig {
    /// A local database at `path`.
    pub fn local(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn audit_default() -> Self {
        Self::local(".chronicle/audit.db")
    }

    pub(crate) fn documents_default() -> Self {
        Self::local(".chronicle/documents.db")
    }

    pub(crate) fn queue_default() -> Self {
        Self::local(".chronicle/queue.db")
    }

    /// Whether this points at a remote database.
    pub fn is_remote(&self) -> bool {
        !self.url.is_empty()
    }

    /// Whether enough is set to open the database at all.
    pub fn is_configured(&self) -> bool {
        if self.is_remote() {
            !self.auth_token.is_empty()
        } else {
            !self.path.is_empty()
        }
    }

    /// Human-readable location for log lines (never includes the token).
    pub fn location(&self) -> &str {
        if self.is_remote() { &self.url } else { &self.path }
    }
}
