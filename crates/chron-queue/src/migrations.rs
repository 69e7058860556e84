use crate::QueueBroker;
use crate::error::TransportError;

const TOPICS_001: &str = include_str!("../migrations/001_topics.sql");

impl QueueBroker {
    pub(crate) async fn run_migrations(&self) -> Result<(), TransportError> {
        self.conn
            .execute_batch(TOPICS_001)
            .await
            .map_err(|e| TransportError::Migration(format!("001_topics: {e}")))?;
        Ok(())
    }
}
