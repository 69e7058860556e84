//! Wire codec for inbound change-event messages.
//!
//! The producer has shipped two payload shapes over time: a group-scoped one
//! carrying `groupId`/`groupName`, and an older task-only one without them.
//! Both decode into the same `ChangeEvent`. The envelope-level `timestamp` is
//! optional in practice (the producer stamps the payload instead), so the
//! occurrence time is resolved envelope first, payload second, clock last.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::enums::{EntityKind, EventKind};
use crate::errors::DecodeError;
use crate::event::ChangeEvent;
use crate::time::parse_event_timestamp;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    event_type: Option<String>,
    timestamp: Option<String>,
    payload: WirePayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WirePayload {
    entity: Option<String>,
    entity_id: Option<String>,
    group_id: Option<String>,
    group_name: Option<String>,
    task_id: Option<String>,
    task_name: Option<String>,
    changes: Option<String>,
    user: Option<String>,
    workspace: Option<String>,
    timestamp: Option<String>,
}

/// Decode a raw message body, falling back to the current UTC instant when no
/// usable timestamp is present.
///
/// # Errors
///
/// Returns `DecodeError` if the body is not a JSON event envelope or lacks
/// `eventType`, `payload.entity`, or `payload.entityId`.
pub fn decode(body: &[u8]) -> Result<ChangeEvent, DecodeError> {
    decode_at(body, Utc::now())
}

/// Decode with an explicit ingestion instant used as the timestamp fallback.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_at(body: &[u8], ingested_at: DateTime<Utc>) -> Result<ChangeEvent, DecodeError> {
    let wire: WireEvent = serde_json::from_slice(body)?;
    let p = wire.payload;

    let event_type = non_empty(wire.event_type).ok_or(DecodeError::MissingField("eventType"))?;
    let entity = non_empty(p.entity).ok_or(DecodeError::MissingField("payload.entity"))?;
    let entity_id = non_empty(p.entity_id).ok_or(DecodeError::MissingField("payload.entityId"))?;

    let timestamp = [wire.timestamp.as_deref(), p.timestamp.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_event_timestamp)
        .unwrap_or(ingested_at);

    let mut event = ChangeEvent {
        event_type: EventKind::from(event_type),
        entity: EntityKind::from(entity),
        entity_id,
        group_id: non_empty(p.group_id),
        group_name: non_empty(p.group_name),
        task_id: non_empty(p.task_id),
        task_name: non_empty(p.task_name),
        changes: p.changes.unwrap_or_default(),
        user: p.user.unwrap_or_default(),
        workspace: p.workspace.unwrap_or_default(),
        timestamp,
    };
    event.normalize_ids();
    Ok(event)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
