//! # chron-lake
//!
//! Durable archive of snapshot artifacts in object storage.
//!
//! Each artifact is one JSON object at `<prefix>/<snapshot_id>.json`. With a
//! bucket configured the archive writes to S3 (or any S3-compatible endpoint
//! such as `MinIO` or R2); otherwise it writes to a local directory so the
//! pipeline runs without cloud credentials.
//!
//! Writes are create-only: exporting the same snapshot twice leaves the first
//! object untouched and reports it as already archived.

pub mod archive;
pub mod error;

pub use archive::{ArchivedSnapshot, SnapshotArchive, UploadOutcome, sanitize_segment};
pub use error::LakeError;
