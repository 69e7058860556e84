//! # chron-core
//!
//! Core types and the event codec for Chronicle.
//!
//! This crate provides the foundational types shared across all Chronicle crates:
//! - `ChangeEvent`, the normalized form of one inbound queue message
//! - `AuditLogRecord` and the summary aggregates read back from the audit log
//! - `SnapshotArtifact`, the full point-in-time copy of the document store
//! - Event, entity, and collection kind enums
//! - The wire codec (`codec::decode`) and its `DecodeError`

pub mod codec;
pub mod enums;
pub mod errors;
pub mod event;
pub mod record;
pub mod snapshot;
pub mod time;

pub use codec::decode;
pub use enums::{Collection, EntityKind, EventKind};
pub use errors::DecodeError;
pub use event::ChangeEvent;
pub use record::{AuditLogRecord, GroupSummary, TaskSummary};
pub use snapshot::{SnapshotArtifact, SnapshotCounts, SnapshotData, SnapshotMetadata};
