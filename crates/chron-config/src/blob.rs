//! Object storage configuration for snapshot archives.
//!
//! S3-compatible storage is used when credentials are present; otherwise
//! snapshots are archived under a local directory.

use serde::{Deserialize, Serialize};

fn default_region() -> String {
    String::from("us-east-1")
}

fn default_local_dir() -> String {
    String::from(".chronicle/blobs")
}

fn default_prefix() -> String {
    String::from("snapshots")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlobConfig {
    /// Bucket name.
    #[serde(default)]
    pub bucket_name: String,

    /// Bucket region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,

    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: String,

    /// Custom endpoint URL (MinIO, R2, ...). Empty means AWS.
    #[serde(default)]
    pub endpoint: String,

    /// Directory used when no bucket is configured.
    #[serde(default = "default_local_dir")]
    pub local_dir: String,

    /// Key prefix every snapshot object is written under.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            endpoint: String::new(),
            local_dir: default_local_dir(),
            prefix: default_prefix(),
        }
    }
}

impl BlobConfig {
    /// Check if the bucket config has the minimum required fields.
    pub fn is_configured(&self) -> bool {
        !self.bucket_name.is_empty()
            && !self.access_key_id.is_empty()
            && !self.secret_access_key.is_empty()
    }

    /// Custom endpoint, if any.
    pub fn endpoint_url(&self) -> Option<&str> {
        if self.endpoint.is_empty() {
            None
        } else {
            Some(&self.endpoint)
        }
    }

    /// Whether the endpoint is plain HTTP (local MinIO and friends).
    pub fn allows_http(&self) -> bool {
        self.endpoint.starts_with("http://")
    }
}
