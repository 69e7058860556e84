//! # chron-queue
//!
//! Durable topics for Chronicle, stored in libSQL.
//!
//! A topic is an append-only log of messages with monotonically increasing
//! offsets. Consumers belong to a group; each group commits the highest offset
//! it has finished with, and a new consumer in the group resumes right after
//! it. Nothing is lost when a consumer stops before committing: the message is
//! delivered again. Delivery is therefore at-least-once.
//!
//! The [`Consumer`] and [`Publisher`] traits are the seams the pipeline is
//! written against; [`QueueBroker`] is the libSQL implementation.

pub mod broker;
pub mod error;
mod migrations;

pub use broker::{QueueBroker, TopicConsumer, TopicPublisher};
pub use error::TransportError;

use async_trait::async_trait;

/// One message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

/// Reads messages from one topic on behalf of a consumer group.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Wait for the next message.
    ///
    /// Returns `TransportError::Closed` once no further message can arrive.
    async fn recv(&mut self) -> Result<Delivery, TransportError>;

    /// Mark `delivery` and everything before it as done for this group.
    async fn commit(&mut self, delivery: &Delivery) -> Result<(), TransportError>;
}

/// Appends messages to one topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a message and return its offset.
    async fn publish(&self, key: Option<&str>, payload: &[u8]) -> Result<i64, TransportError>;
}
