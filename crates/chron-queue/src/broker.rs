//! libSQL implementation of durable topics.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use chron_config::QueueConfig;
use libsql::Builder;

use crate::error::TransportError;
use crate::{Consumer, Delivery, Publisher};

/// Default wait between polls of an idle topic.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Owns the queue database and hands out publishers and consumers.
pub struct QueueBroker {
    #[allow(dead_code)]
    db: libsql::Database,
    pub(crate) conn: libsql::Connection,
    poll_interval: Duration,
}

impl QueueBroker {
    /// Open a local queue database. Runs migrations on open.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the database cannot be opened or migrated.
    pub async fn open_local(path: &str) -> Result<Self, TransportError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        conn.query("PRAGMA busy_timeout = 5000", ())
            .await
            .map_err(|e| TransportError::Migration(format!("PRAGMA busy_timeout: {e}")))?;

        let broker = Self {
            db,
            conn,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        broker.run_migrations().await?;
        Ok(broker)
    }

    /// Open a remote queue database. Runs migrations on open.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the connection or migrations fail.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, TransportError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        let conn = db.connect()?;

        let broker = Self {
            db,
            conn,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        broker.run_migrations().await?;
        Ok(broker)
    }

    /// Open the configured queue store with the configured poll interval.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotConfigured` if no location is set.
    pub async fn open(config: &QueueConfig) -> Result<Self, TransportError> {
        let store = &config.store;
        if !store.is_configured() {
            return Err(TransportError::NotConfigured);
        }
        let broker = if store.is_remote() {
            Self::open_remote(&store.url, &store.auth_token).await?
        } else {
            if let Some(parent) = std::path::Path::new(&store.path).parent() {
                if !parent.as_os_str().is_empty() && store.path != ":memory:" {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Self::open_local(&store.path).await?
        };
        tracing::info!(location = store.location(), "queue store ready");
        Ok(broker.with_poll_interval(Duration::from_millis(config.poll_interval_ms)))
    }

    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// A publisher appending to `topic`.
    #[must_use]
    pub fn publisher(&self, topic: &str) -> TopicPublisher {
        TopicPublisher {
            conn: self.conn.clone(),
            topic: topic.to_string(),
        }
    }

    /// A consumer reading `topic` for `group`, positioned after the group's
    /// last committed offset.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the committed offset cannot be read.
    pub async fn consumer(&self, topic: &str, group: &str) -> Result<TopicConsumer, TransportError> {
        let position = self.committed(topic, group).await?.unwrap_or(0);
        tracing::debug!(topic, group, position, "consumer positioned");
        Ok(TopicConsumer {
            conn: self.conn.clone(),
            topic: topic.to_string(),
            group: group.to_string(),
            position,
            poll_interval: self.poll_interval,
        })
    }

    /// The group's committed offset on `topic`, if it has ever committed.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the query fails.
    pub async fn committed(&self, topic: &str, group: &str) -> Result<Option<i64>, TransportError> {
        let mut rows = self
            .conn
            .query(
                "SELECT committed FROM consumer_offsets WHERE group_id = ?1 AND topic = ?2",
                [group, topic],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<i64>(0)?)),
            None => Ok(None),
        }
    }

    /// Number of messages on `topic` the group has not committed yet.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the query fails.
    pub async fn lag(&self, topic: &str, group: &str) -> Result<u64, TransportError> {
        let committed = self.committed(topic, group).await?.unwrap_or(0);
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM topic_messages WHERE topic = ?1 AND msg_offset > ?2",
                libsql::params![topic, committed],
            )
            .await?;
        let row = rows.next().await?.ok_or(TransportError::NoResult)?;
        Ok(u64::try_from(row.get::<i64>(0)?).unwrap_or(0))
    }
}

/// Appends to one topic.
#[derive(Clone)]
pub struct TopicPublisher {
    conn: libsql::Connection,
    topic: String,
}

impl TopicPublisher {
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Publisher for TopicPublisher {
    async fn publish(&self, key: Option<&str>, payload: &[u8]) -> Result<i64, TransportError> {
        let published_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut rows = self
            .conn
            .query(
                "INSERT INTO topic_messages (topic, msg_key, payload, published_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING msg_offset",
                libsql::params![
                    self.topic.as_str(),
                    key,
                    payload.to_vec(),
                    published_at.as_str()
                ],
            )
            .await?;
        let row = rows.next().await?.ok_or(TransportError::NoResult)?;
        let offset = row.get::<i64>(0)?;
        tracing::debug!(topic = %self.topic, offset, "message published");
        Ok(offset)
    }
}

/// Reads one topic for one consumer group.
pub struct TopicConsumer {
    conn: libsql::Connection,
    topic: String,
    group: String,
    position: i64,
    poll_interval: Duration,
}

impl TopicConsumer {
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Offset of the last message handed out.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    /// Fetch the next message without waiting.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the read fails.
    pub async fn poll(&mut self) -> Result<Option<Delivery>, TransportError> {
        let mut rows = self
            .conn
            .query(
                "SELECT msg_offset, msg_key, payload FROM topic_messages
                 WHERE topic = ?1 AND msg_offset > ?2
                 ORDER BY msg_offset LIMIT 1",
                libsql::params![self.topic.as_str(), self.position],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        // Advance first: a row with an odd column type must not be re-read forever.
        let offset = row.get::<i64>(0)?;
        self.position = offset;
        Ok(Some(Delivery {
            topic: self.topic.clone(),
            offset,
            key: key_text(row.get_value(1)?),
            payload: payload_bytes(row.get_value(2)?),
        }))
    }
}

/// Message keys written outside the publisher may not be TEXT.
fn key_text(value: libsql::Value) -> Option<String> {
    match value {
        libsql::Value::Text(text) => Some(text),
        libsql::Value::Blob(bytes) => String::from_utf8(bytes).ok(),
        libsql::Value::Integer(n) => Some(n.to_string()),
        libsql::Value::Real(x) => Some(x.to_string()),
        libsql::Value::Null => None,
    }
}

/// Payload bytes of whatever SQLite stored. Anything that is not the
/// expected JSON fails decoding downstream and is skipped there.
fn payload_bytes(value: libsql::Value) -> Vec<u8> {
    match value {
        libsql::Value::Blob(bytes) => bytes,
        libsql::Value::Text(text) => text.into_bytes(),
        libsql::Value::Integer(n) => n.to_string().into_bytes(),
        libsql::Value::Real(x) => x.to_string().into_bytes(),
        libsql::Value::Null => Vec::new(),
    }
}

#[async_trait]
impl Consumer for TopicConsumer {
    async fn recv(&mut self) -> Result<Delivery, TransportError> {
        loop {
            if let Some(delivery) = self.poll().await? {
                return Ok(delivery);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), TransportError> {
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .execute(
                "INSERT INTO consumer_offsets (group_id, topic, committed, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (group_id, topic) DO UPDATE
                 SET committed = max(committed, excluded.committed),
                     updated_at = excluded.updated_at",
                libsql::params![
                    self.group.as_str(),
                    self.topic.as_str(),
                    delivery.offset,
                    updated_at.as_str()
                ],
            )
            .await?;
        Ok(())
    }
}
