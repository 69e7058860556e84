//! JSONL dead-letter journal.
//!
//! Messages that exhausted their retries are appended to
//! `{dir}/dead-letters-YYYY-MM-DD.jsonl`, one file per UTC day, with
//! `serde_jsonlines::append_json_lines`. The journal is for operators:
//! nothing replays it automatically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use chron_queue::Delivery;

use crate::error::DeadLetterError;

const FILE_PREFIX: &str = "dead-letters-";
const FILE_SUFFIX: &str = ".jsonl";

/// Which step gave up on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterStage {
    AuditAppend,
    SnapshotExport,
}

/// One abandoned message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub recorded_at: DateTime<Utc>,
    pub stage: DeadLetterStage,
    pub topic: String,
    pub offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub error: String,
    /// Message body, lossily decoded as UTF-8.
    pub payload: String,
}

impl DeadLetter {
    #[must_use]
    pub fn from_delivery(stage: DeadLetterStage, delivery: &Delivery, error: &str) -> Self {
        Self {
            recorded_at: Utc::now(),
            stage,
            topic: delivery.topic.clone(),
            offset: delivery.offset,
            key: delivery.key.clone(),
            error: error.to_string(),
            payload: String::from_utf8_lossy(&delivery.payload).into_owned(),
        }
    }
}

/// Appends dead letters to per-day JSONL files.
pub struct DeadLetterWriter {
    dir: PathBuf,
    enabled: bool,
}

impl DeadLetterWriter {
    /// Create a writer for `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `DeadLetterError::Io` if the directory cannot be created.
    pub fn new(dir: PathBuf) -> Result<Self, DeadLetterError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, enabled: true })
    }

    /// A writer that records nothing and always reports failure, so callers
    /// leave the offset uncommitted.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one dead letter to the file for its day.
    ///
    /// # Errors
    ///
    /// Returns `DeadLetterError::Disabled` for a disabled writer, or
    /// `DeadLetterError::Io` if the append fails.
    pub fn append(&self, letter: &DeadLetter) -> Result<PathBuf, DeadLetterError> {
        if !self.enabled {
            return Err(DeadLetterError::Disabled);
        }
        let path = day_path(&self.dir, letter.recorded_at.date_naive());
        serde_jsonlines::append_json_lines(&path, [letter])?;
        tracing::warn!(
            stage = ?letter.stage,
            topic = %letter.topic,
            offset = letter.offset,
            path = %path.display(),
            "message dead-lettered"
        );
        Ok(path)
    }
}

/// Path of the journal file for `day`.
#[must_use]
pub fn day_path(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", day.format("%Y-%m-%d")))
}

/// Days that have a journal file, oldest first.
///
/// # Errors
///
/// Returns `DeadLetterError::Io` if the directory cannot be read. A missing
/// directory yields an empty list.
pub fn journal_days(dir: &Path) -> Result<Vec<NaiveDate>, DeadLetterError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut days = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(day) = name
            .to_str()
            .and_then(|n| n.strip_prefix(FILE_PREFIX))
            .and_then(|n| n.strip_suffix(FILE_SUFFIX))
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            continue;
        };
        days.push(day);
    }
    days.sort_unstable();
    Ok(days)
}

/// Every dead letter recorded on `day`.
///
/// # Errors
///
/// Returns `DeadLetterError::Io` if the file exists but cannot be read or
/// holds a malformed line.
pub fn read_day(dir: &Path, day: NaiveDate) -> Result<Vec<DeadLetter>, DeadLetterError> {
    let path = day_path(dir, day);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let letters = serde_jsonlines::json_lines(&path)?.collect::<Result<Vec<DeadLetter>, _>>()?;
    Ok(letters)
}
