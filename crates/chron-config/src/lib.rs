//! # chron-config
//!
//! Layered configuration loading for Chronicle using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CHRONICLE_*` prefix, `__` as separator)
//! 2. An explicit file passed by the caller, or `./chronicle.toml`
//! 3. User-level `~/.config/chronicle/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `CHRONICLE_AUDIT__PATH` -> `audit.path`,
//! `CHRONICLE_QUEUE__STORE__URL` -> `queue.store.url`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use chron_config::ChronicleConfig;
//!
//! let config = ChronicleConfig::load_with_dotenv(None).expect("config");
//! println!("audit log at {}", config.audit.location());
//! ```

mod blob;
mod database;
mod error;
mod pipeline;
mod queue;

pub use blob::BlobConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use pipeline::PipelineConfig;
pub use queue::QueueConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "chronicle.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChronicleConfig {
    /// Audit log database.
    #[serde(default = "DatabaseConfig::audit_default")]
    pub audit: DatabaseConfig,
    /// Document store captured by snapshots.
    #[serde(default = "DatabaseConfig::documents_default")]
    pub documents: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            audit: DatabaseConfig::audit_default(),
            documents: DatabaseConfig::documents_default(),
            queue: QueueConfig::default(),
            blob: BlobConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ChronicleConfig {
    /// Load configuration from all sources and validate it.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source fails to parse or a value is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(explicit).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the current directory, then [`Self::load`].
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_with_dotenv(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();
        Self::load(explicit)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer extra providers.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        match explicit {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
                if local_path.exists() {
                    figment = figment.merge(Toml::file(local_path));
                }
            }
        }

        figment.merge(Env::prefixed("CHRONICLE_").split("__"))
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.pipeline.retry_max_attempts == 0 {
            return Err(invalid("pipeline.retry_max_attempts", "must be at least 1"));
        }
        if self.pipeline.query_limit == 0 {
            return Err(invalid("pipeline.query_limit", "must be at least 1"));
        }
        if self.pipeline.snapshot_queue_capacity == 0 {
            return Err(invalid(
                "pipeline.snapshot_queue_capacity",
                "must be at least 1",
            ));
        }
        if self.queue.events_topic.trim().is_empty() {
            return Err(invalid("queue.events_topic", "must not be empty"));
        }
        if self.queue.snapshots_topic.trim().is_empty() {
            return Err(invalid("queue.snapshots_topic", "must not be empty"));
        }
        if self.queue.events_topic == self.queue.snapshots_topic {
            return Err(invalid(
                "queue.snapshots_topic",
                "must differ from queue.events_topic",
            ));
        }
        if self.blob.prefix.trim_matches('/').is_empty() {
            return Err(invalid("blob.prefix", "must not be empty"));
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chronicle").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ChronicleConfig::default();
        config.validate().expect("defaults should validate");
        assert!(config.audit.is_configured());
        assert!(!config.blob.is_configured());
        assert_eq!(config.pipeline.query_limit, 100);
    }

    #[test]
    fn figment_builds_without_files() {
        let config: ChronicleConfig = ChronicleConfig::figment(None)
            .extract()
            .expect("should extract defaults");
        assert_eq!(config.queue.events_topic, "todo-history-events");
        assert_eq!(config.audit.path, ".chronicle/audit.db");
    }

    #[test]
    fn zero_retry_attempts_rejected() {
        let mut config = ChronicleConfig::default();
        config.pipeline.retry_max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline.retry_max_attempts"));
    }

    #[test]
    fn shared_topic_rejected() {
        let mut config = ChronicleConfig::default();
        config.queue.snapshots_topic = config.queue.events_topic.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn slash_only_prefix_rejected() {
        let mut config = ChronicleConfig::default();
        config.blob.prefix = "//".into();
        assert!(config.validate().is_err());
    }
}
