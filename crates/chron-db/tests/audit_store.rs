//! Audit log store integration tests: append, ordering, limits, summaries.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use chron_core::{ChangeEvent, EntityKind, EventKind};
use chron_db::AuditLogStore;

async fn test_store() -> AuditLogStore {
    AuditLogStore::open_local(":memory:").await.unwrap()
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

fn task_event(task_id: &str, group_id: &str, at: DateTime<Utc>) -> ChangeEvent {
    ChangeEvent {
        event_type: EventKind::TaskUpdated,
        entity: EntityKind::Task,
        entity_id: task_id.into(),
        group_id: Some(group_id.into()),
        group_name: None,
        task_id: Some(task_id.into()),
        task_name: Some(format!("task {task_id}")),
        changes: "title changed".into(),
        user: "ann".into(),
        workspace: "home".into(),
        timestamp: at,
    }
}

fn group_event(group_id: &str, name: Option<&str>, at: DateTime<Utc>) -> ChangeEvent {
    ChangeEvent {
        event_type: EventKind::GroupUpdated,
        entity: EntityKind::Group,
        entity_id: group_id.into(),
        group_id: Some(group_id.into()),
        group_name: name.map(Into::into),
        task_id: None,
        task_name: None,
        changes: String::new(),
        user: String::new(),
        workspace: String::new(),
        timestamp: at,
    }
}

// ---------------------------------------------------------------------------
// Append
// ---------------------------------------------------------------------------

#[tokio::test]
async fn append_assigns_increasing_sequence() {
    let store = test_store().await;
    let first = store.append(&task_event("t-1", "g-1", base_time())).await.unwrap();
    let second = store.append(&task_event("t-1", "g-1", base_time())).await.unwrap();
    assert!(second.seq > first.seq);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn stored_record_reads_back_unchanged() {
    let store = test_store().await;
    let event = task_event("t-1", "g-1", base_time() + Duration::microseconds(123_456));
    let appended = store.append(&event).await.unwrap();

    let records = store.query_by_task("t-1", None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event, event);
    assert_eq!(records[0].seq, appended.seq);
}

#[tokio::test]
async fn appended_record_matches_read_back_at_stored_precision() {
    let store = test_store().await;
    let event = task_event("t-1", "g-1", base_time() + Duration::nanoseconds(123_456_789));
    let appended = store.append(&event).await.unwrap();

    let records = store.query_by_task("t-1", None).await.unwrap();
    assert_eq!(records[0].event, appended.event);
    assert_eq!(
        appended.event.timestamp,
        base_time() + Duration::microseconds(123_456)
    );
}

#[tokio::test]
async fn blank_optional_text_reads_back_blank() {
    let store = test_store().await;
    let event = group_event("g-1", None, base_time());
    store.append(&event).await.unwrap();

    let records = store.query_by_group("g-1", None).await.unwrap();
    assert_eq!(records[0].event.changes, "");
    assert_eq!(records[0].event.user, "");
    assert_eq!(records[0].event.group_name, None);
}

#[tokio::test]
async fn records_cannot_be_updated() {
    let store = test_store().await;
    store.append(&task_event("t-1", "g-1", base_time())).await.unwrap();
    let result = store
        .db()
        .conn()
        .execute("UPDATE change_event_logs SET changes = 'rewritten'", ())
        .await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn group_history_is_newest_first_and_limited() {
    let store = test_store().await;
    for minute in 0..5 {
        store
            .append(&task_event("t-1", "g-1", base_time() + Duration::minutes(minute)))
            .await
            .unwrap();
    }
    store.append(&task_event("t-9", "g-2", base_time())).await.unwrap();

    let records = store.query_by_group("g-1", Some(3)).await.unwrap();
    let times: Vec<_> = records.iter().map(|r| r.event.timestamp).collect();
    assert_eq!(
        times,
        vec![
            base_time() + Duration::minutes(4),
            base_time() + Duration::minutes(3),
            base_time() + Duration::minutes(2),
        ]
    );
}

#[tokio::test]
async fn ties_on_timestamp_break_by_sequence() {
    let store = test_store().await;
    let mut first = task_event("t-1", "g-1", base_time());
    first.changes = "first".into();
    let mut second = task_event("t-1", "g-1", base_time());
    second.changes = "second".into();
    store.append(&first).await.unwrap();
    store.append(&second).await.unwrap();

    let records = store.query_by_task("t-1", None).await.unwrap();
    assert_eq!(records[0].event.changes, "second");
    assert_eq!(records[1].event.changes, "first");
}

#[tokio::test]
async fn limit_is_capped_at_store_maximum() {
    let store = test_store().await;
    for i in 0..120 {
        store
            .append(&task_event("t-1", "g-1", base_time() + Duration::seconds(i)))
            .await
            .unwrap();
    }
    assert_eq!(store.query_by_task("t-1", Some(500)).await.unwrap().len(), 100);
    assert_eq!(store.query_by_task("t-1", None).await.unwrap().len(), 100);
    assert!(store.query_by_task("t-1", Some(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_ids_return_empty() {
    let store = test_store().await;
    store.append(&task_event("t-1", "g-1", base_time())).await.unwrap();
    assert!(store.query_by_group("nope", None).await.unwrap().is_empty());
    assert!(store.query_by_task("nope", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn entity_query_finds_snapshot_records() {
    let store = test_store().await;
    let event = ChangeEvent::snapshot_created(
        "snapshot_2024_01_01_00_00_00",
        "Snapshot created".into(),
        "ops",
        base_time(),
    );
    store.append(&event).await.unwrap();

    let records = store
        .query_by_entity("SYSTEM", "snapshot_2024_01_01_00_00_00", None)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event.event_type, EventKind::SnapshotCreated);
    assert_eq!(records[0].event.workspace, "system");
}

#[tokio::test]
async fn unreadable_rows_are_skipped() {
    let store = test_store().await;
    store.append(&task_event("t-1", "g-1", base_time())).await.unwrap();
    store
        .db()
        .conn()
        .execute(
            "INSERT INTO change_event_logs (timestamp, partition_day, event_type, entity, entity_id,
                 task_id, recorded_at)
             VALUES ('not a time', '2024-01-01', 'TASK_UPDATED', 'TASK', 't-1', 't-1', 'x')",
            (),
        )
        .await
        .unwrap();

    let records = store.query_by_task("t-1", None).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn unreadable_summary_rows_are_skipped() {
    let store = test_store().await;
    store.append(&task_event("t-1", "g-1", base_time())).await.unwrap();
    store
        .db()
        .conn()
        .execute(
            "INSERT INTO change_event_logs (timestamp, partition_day, event_type, entity, entity_id,
                 group_id, task_id, recorded_at)
             VALUES ('not-a-date', '2024-01-01', 'TASK_UPDATED', 'Task', 't-2', 'g-2', 't-2', 'x')",
            (),
        )
        .await
        .unwrap();

    let groups = store.group_summaries(None).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_id, "g-1");

    let tasks = store.task_summaries(None, None).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_id, "t-1");
}

#[tokio::test]
async fn recent_spans_all_entities() {
    let store = test_store().await;
    store.append(&group_event("g-1", Some("Chores"), base_time())).await.unwrap();
    store
        .append(&task_event("t-1", "g-1", base_time() + Duration::minutes(1)))
        .await
        .unwrap();

    let records = store.recent(Some(10)).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].event.entity, EntityKind::Task);
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn group_summaries_count_and_take_latest_name() {
    let store = test_store().await;
    store.append(&group_event("g-1", Some("Chores"), base_time())).await.unwrap();
    store
        .append(&group_event("g-1", Some("House chores"), base_time() + Duration::minutes(5)))
        .await
        .unwrap();
    store
        .append(&task_event("t-1", "g-1", base_time() + Duration::minutes(10)))
        .await
        .unwrap();
    store
        .append(&group_event("g-2", None, base_time() + Duration::minutes(1)))
        .await
        .unwrap();

    let summaries = store.group_summaries(None).await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].group_id, "g-1");
    assert_eq!(summaries[0].group_name.as_deref(), Some("House chores"));
    assert_eq!(summaries[0].log_count, 3);
    assert_eq!(summaries[0].last_activity, base_time() + Duration::minutes(10));
    assert_eq!(summaries[1].group_id, "g-2");
    assert_eq!(summaries[1].group_name, None);
}

#[tokio::test]
async fn task_summaries_filter_by_group() {
    let store = test_store().await;
    store.append(&task_event("t-1", "g-1", base_time())).await.unwrap();
    store
        .append(&task_event("t-1", "g-1", base_time() + Duration::minutes(1)))
        .await
        .unwrap();
    store
        .append(&task_event("t-2", "g-2", base_time() + Duration::minutes(2)))
        .await
        .unwrap();

    let all = store.task_summaries(None, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].task_id, "t-2");

    let in_g1 = store.task_summaries(Some("g-1"), None).await.unwrap();
    assert_eq!(in_g1.len(), 1);
    assert_eq!(in_g1[0].task_id, "t-1");
    assert_eq!(in_g1[0].log_count, 2);
    assert_eq!(in_g1[0].task_name.as_deref(), Some("task t-1"));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_appends_all_land() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("audit.db");
    let store = std::sync::Arc::new(
        AuditLogStore::open_local(path.to_str().unwrap()).await.unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append(&task_event(&format!("t-{i}"), "g-1", base_time()))
                .await
                .map(|r| r.seq)
        }));
    }
    let mut seqs = Vec::new();
    for handle in handles {
        seqs.push(handle.await.unwrap().unwrap());
    }
    seqs.sort_unstable();
    seqs.dedup();
    assert_eq!(seqs.len(), 8);
    assert_eq!(store.count().await.unwrap(), 8);
}
