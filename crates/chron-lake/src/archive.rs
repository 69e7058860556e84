//! Snapshot upload, listing, and retrieval.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chron_config::BlobConfig;
use chron_core::SnapshotArtifact;
use futures_util::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutMode, PutOptions, PutPayload};

use crate::error::LakeError;

const CONTENT_TYPE_JSON: &str = "application/json";
const OBJECT_SUFFIX: &str = ".json";

/// Replace everything outside `[A-Za-z0-9._-]` so a value is safe as one key
/// segment. Runs of replaced characters collapse to one `_`.
#[must_use]
pub fn sanitize_segment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_underscore = false;

    for ch in input.chars() {
        let keep = ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_';
        if keep {
            out.push(ch);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }

    let sanitized = out.trim_matches(|c| c == '_' || c == '.');
    if sanitized.is_empty() {
        return "_".to_string();
    }

    let mut capped = sanitized.to_string();
    if capped.len() > 128 {
        capped.truncate(128);
    }
    capped
}

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A new object was written.
    Created { key: String, size: usize },
    /// An object already existed under the key and was left as is.
    AlreadyExists { key: String },
}

impl UploadOutcome {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Created { key, .. } | Self::AlreadyExists { key } => key,
        }
    }
}

/// One entry of the archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedSnapshot {
    pub snapshot_id: String,
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Snapshot artifacts stored under one key prefix of an object store.
#[derive(Clone)]
pub struct SnapshotArchive {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    /// `LocalFileSystem` rejects object attributes, so content type is only
    /// sent to backends that keep it.
    supports_attributes: bool,
    /// Scheme and root used when reporting where an object went.
    base_uri: String,
}

impl SnapshotArchive {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str, supports_attributes: bool) -> Self {
        Self {
            store,
            prefix: prefix.trim_matches('/').to_string(),
            supports_attributes,
            base_uri: String::new(),
        }
    }

    #[must_use]
    pub fn with_base_uri(mut self, base_uri: &str) -> Self {
        self.base_uri = base_uri.to_string();
        self
    }

    /// An archive held in memory, for tests and dry runs.
    #[must_use]
    pub fn in_memory(prefix: &str) -> Self {
        Self::new(Arc::new(InMemory::new()), prefix, true).with_base_uri("memory://")
    }

    /// Open the configured backend: S3 when a bucket and credentials are set,
    /// otherwise the local directory.
    ///
    /// # Errors
    ///
    /// Returns `LakeError` if the S3 client cannot be built or the local
    /// directory cannot be created.
    pub fn open(config: &BlobConfig) -> Result<Self, LakeError> {
        if config.is_configured() {
            let mut builder = AmazonS3Builder::new()
                .with_bucket_name(&config.bucket_name)
                .with_region(&config.region)
                .with_access_key_id(&config.access_key_id)
                .with_secret_access_key(&config.secret_access_key);
            if let Some(endpoint) = config.endpoint_url() {
                builder = builder
                    .with_endpoint(endpoint)
                    .with_allow_http(config.allows_http());
            }
            let store = builder.build()?;
            tracing::info!(bucket = %config.bucket_name, prefix = %config.prefix, "snapshot archive on S3");
            Ok(Self::new(Arc::new(store), &config.prefix, true)
                .with_base_uri(&format!("s3://{}", config.bucket_name)))
        } else {
            std::fs::create_dir_all(&config.local_dir)?;
            let store = LocalFileSystem::new_with_prefix(&config.local_dir)?;
            tracing::info!(dir = %config.local_dir, prefix = %config.prefix, "snapshot archive on local disk");
            Ok(Self::new(Arc::new(store), &config.prefix, false)
                .with_base_uri(&format!("file://{}", config.local_dir)))
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full destination URI of an object key, for log lines.
    #[must_use]
    pub fn uri_for(&self, key: &str) -> String {
        if self.base_uri.is_empty() {
            key.to_string()
        } else if self.base_uri.ends_with("://") {
            format!("{}{key}", self.base_uri)
        } else {
            format!("{}/{key}", self.base_uri.trim_end_matches('/'))
        }
    }

    /// Object key for a snapshot: `<prefix>/<sanitized id>.json`.
    #[must_use]
    pub fn object_path(&self, snapshot_id: &str) -> Path {
        Path::from(format!(
            "{}/{}{OBJECT_SUFFIX}",
            self.prefix,
            sanitize_segment(snapshot_id)
        ))
    }

    /// Store an artifact's bytes exactly as given.
    ///
    /// # Errors
    ///
    /// Returns `LakeError::ObjectStore` if the write fails for any reason
    /// other than the object already existing.
    pub async fn upload(&self, snapshot_id: &str, body: &[u8]) -> Result<UploadOutcome, LakeError> {
        let path = self.object_path(snapshot_id);
        let mut attributes = Attributes::new();
        if self.supports_attributes {
            attributes.insert(Attribute::ContentType, CONTENT_TYPE_JSON.into());
        }
        let opts = PutOptions {
            mode: PutMode::Create,
            attributes,
            ..PutOptions::default()
        };

        match self
            .store
            .put_opts(&path, PutPayload::from(body.to_vec()), opts)
            .await
        {
            Ok(_) => Ok(UploadOutcome::Created {
                key: path.to_string(),
                size: body.len(),
            }),
            Err(object_store::Error::AlreadyExists { .. }) => Ok(UploadOutcome::AlreadyExists {
                key: path.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Every archived snapshot, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LakeError::ObjectStore` if the listing fails.
    pub async fn list(&self) -> Result<Vec<ArchivedSnapshot>, LakeError> {
        let prefix = Path::from(self.prefix.as_str());
        let metas: Vec<_> = self.store.list(Some(&prefix)).try_collect().await?;

        let mut snapshots: Vec<ArchivedSnapshot> = metas
            .into_iter()
            .filter_map(|meta| {
                let snapshot_id = meta.location.filename()?.strip_suffix(OBJECT_SUFFIX)?.to_string();
                Some(ArchivedSnapshot {
                    snapshot_id,
                    key: meta.location.to_string(),
                    size: meta.size.try_into().unwrap_or_default(),
                    last_modified: meta.last_modified,
                })
            })
            .collect();
        snapshots.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.snapshot_id.cmp(&a.snapshot_id))
        });
        Ok(snapshots)
    }

    /// The stored bytes of one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `LakeError::SnapshotNotFound` if nothing is stored under the id.
    pub async fn fetch_raw(&self, snapshot_id: &str) -> Result<Vec<u8>, LakeError> {
        let path = self.object_path(snapshot_id);
        match self.store.get(&path).await {
            Ok(result) => Ok(result.bytes().await?.to_vec()),
            Err(object_store::Error::NotFound { .. }) => {
                Err(LakeError::SnapshotNotFound(snapshot_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load one snapshot and check it is the one asked for.
    ///
    /// # Errors
    ///
    /// Returns `LakeError::SnapshotNotFound`, `LakeError::InvalidArtifact`, or
    /// `LakeError::IdMismatch`.
    pub async fn fetch(&self, snapshot_id: &str) -> Result<SnapshotArtifact, LakeError> {
        let bytes = self.fetch_raw(snapshot_id).await?;
        let artifact =
            SnapshotArtifact::from_json(&bytes).map_err(|source| LakeError::InvalidArtifact {
                key: self.object_path(snapshot_id).to_string(),
                source,
            })?;
        if artifact.snapshot_id != snapshot_id {
            return Err(LakeError::IdMismatch {
                requested: snapshot_id.to_string(),
                found: artifact.snapshot_id,
            });
        }
        Ok(artifact)
    }
}
