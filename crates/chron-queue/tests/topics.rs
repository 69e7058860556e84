//! Topic publish / consume / commit behaviour.

use std::time::Duration;

use pretty_assertions::assert_eq;

use chron_queue::{Consumer, Publisher, QueueBroker};

async fn file_broker(dir: &tempfile::TempDir) -> QueueBroker {
    let path = dir.path().join("queue.db");
    QueueBroker::open_local(path.to_str().unwrap())
        .await
        .unwrap()
        .with_poll_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn messages_arrive_in_publish_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let broker = file_broker(&dir).await;
    let publisher = broker.publisher("events");
    for body in ["a", "b", "c"] {
        publisher.publish(Some("k"), body.as_bytes()).await.unwrap();
    }

    let mut consumer = broker.consumer("events", "ingest").await.unwrap();
    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(consumer.recv().await.unwrap().payload);
    }
    assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[tokio::test]
async fn topics_are_isolated() {
    let dir = tempfile::TempDir::new().unwrap();
    let broker = file_broker(&dir).await;
    broker.publisher("events").publish(None, b"event").await.unwrap();
    broker.publisher("snapshots").publish(Some("snap-1"), b"snap").await.unwrap();

    let mut consumer = broker.consumer("snapshots", "export").await.unwrap();
    let delivery = consumer.recv().await.unwrap();
    assert_eq!(delivery.payload, b"snap".to_vec());
    assert_eq!(delivery.key.as_deref(), Some("snap-1"));
    assert_eq!(delivery.topic, "snapshots");
    assert!(consumer.poll().await.unwrap().is_none());
}

#[tokio::test]
async fn uncommitted_message_is_redelivered_to_the_group() {
    let dir = tempfile::TempDir::new().unwrap();
    let broker = file_broker(&dir).await;
    let publisher = broker.publisher("events");
    publisher.publish(None, b"first").await.unwrap();
    publisher.publish(None, b"second").await.unwrap();

    let mut consumer = broker.consumer("events", "ingest").await.unwrap();
    let first = consumer.recv().await.unwrap();
    consumer.commit(&first).await.unwrap();
    let _second = consumer.recv().await.unwrap();
    drop(consumer);

    let mut restarted = broker.consumer("events", "ingest").await.unwrap();
    assert_eq!(restarted.recv().await.unwrap().payload, b"second".to_vec());
}

#[tokio::test]
async fn commits_never_move_backwards() {
    let dir = tempfile::TempDir::new().unwrap();
    let broker = file_broker(&dir).await;
    let publisher = broker.publisher("events");
    publisher.publish(None, b"1").await.unwrap();
    publisher.publish(None, b"2").await.unwrap();

    let mut consumer = broker.consumer("events", "ingest").await.unwrap();
    let one = consumer.recv().await.unwrap();
    let two = consumer.recv().await.unwrap();
    consumer.commit(&two).await.unwrap();
    consumer.commit(&one).await.unwrap();

    assert_eq!(broker.committed("events", "ingest").await.unwrap(), Some(two.offset));
    assert_eq!(broker.lag("events", "ingest").await.unwrap(), 0);
}

#[tokio::test]
async fn groups_track_offsets_independently() {
    let dir = tempfile::TempDir::new().unwrap();
    let broker = file_broker(&dir).await;
    broker.publisher("events").publish(None, b"x").await.unwrap();

    let mut a = broker.consumer("events", "a").await.unwrap();
    let delivery = a.recv().await.unwrap();
    a.commit(&delivery).await.unwrap();

    assert_eq!(broker.lag("events", "a").await.unwrap(), 0);
    assert_eq!(broker.lag("events", "b").await.unwrap(), 1);
    let mut b = broker.consumer("events", "b").await.unwrap();
    assert_eq!(b.recv().await.unwrap().payload, b"x".to_vec());
}

#[tokio::test]
async fn recv_waits_for_a_later_publish() {
    let dir = tempfile::TempDir::new().unwrap();
    let broker = file_broker(&dir).await;
    let mut consumer = broker.consumer("events", "ingest").await.unwrap();
    let publisher = broker.publisher("events");

    let waiter = tokio::spawn(async move { consumer.recv().await.map(|d| d.payload) });
    tokio::time::sleep(Duration::from_millis(50)).await;
    publisher.publish(None, b"late").await.unwrap();

    let payload = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(payload, b"late".to_vec());
}

#[tokio::test]
async fn foreign_column_types_are_delivered_not_stuck() {
    let dir = tempfile::TempDir::new().unwrap();
    let broker = file_broker(&dir).await;
    broker
        .conn()
        .execute(
            "INSERT INTO topic_messages (topic, msg_key, payload, published_at)
             VALUES ('events', 42, 'not a blob', '2024-01-01T00:00:00Z'),
                    ('events', NULL, 7, '2024-01-01T00:00:00Z')",
            (),
        )
        .await
        .unwrap();
    broker.publisher("events").publish(None, b"next").await.unwrap();

    let mut consumer = broker.consumer("events", "ingest").await.unwrap();
    let text = consumer.poll().await.unwrap().unwrap();
    assert_eq!(text.payload, b"not a blob".to_vec());
    assert_eq!(text.key.as_deref(), Some("42"));

    let number = consumer.poll().await.unwrap().unwrap();
    assert_eq!(number.payload, b"7".to_vec());
    assert_eq!(number.key, None);

    assert_eq!(consumer.poll().await.unwrap().unwrap().payload, b"next".to_vec());
}
