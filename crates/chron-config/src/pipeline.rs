//! Retry, dead-letter, and query settings for the pipeline loops.

use serde::{Deserialize, Serialize};

const fn default_retry_max_attempts() -> u32 {
    4
}

const fn default_retry_base_delay_ms() -> u64 {
    100
}

const fn default_retry_max_delay_ms() -> u64 {
    2_000
}

fn default_dead_letter_dir() -> String {
    String::from(".chronicle/dead-letters")
}

const fn default_snapshot_queue_capacity() -> usize {
    1
}

/// Default (and maximum) number of rows returned by audit queries.
const fn default_query_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Attempts per store write, publish, or upload (including the first).
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Directory of the dead-letter journal.
    #[serde(default = "default_dead_letter_dir")]
    pub dead_letter_dir: String,

    /// Snapshot triggers that may wait while a build is running.
    #[serde(default = "default_snapshot_queue_capacity")]
    pub snapshot_queue_capacity: usize,

    #[serde(default = "default_query_limit")]
    pub query_limit: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            dead_letter_dir: default_dead_letter_dir(),
            snapshot_queue_capacity: default_snapshot_queue_capacity(),
            query_limit: default_query_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = PipelineConfig::default();
        assert_eq!(config.retry_max_attempts, 4);
        assert_eq!(config.retry_base_delay_ms, 100);
        assert_eq!(config.retry_max_delay_ms, 2_000);
        assert_eq!(config.query_limit, 100);
        assert_eq!(config.snapshot_queue_capacity, 1);
    }
}
