//! Error types for chron-core.
//!
//! Store and transport errors live in their own crates. The only error that
//! originates here is a message that cannot be turned into a `ChangeEvent`.

use thiserror::Error;

/// A raw queue message could not be decoded into a `ChangeEvent`.
///
/// Decode errors are never retried: the message is dropped and consumption
/// continues with the next one.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON or does not have the envelope shape.
    #[error("Malformed event JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field the audit log keys on is missing or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
