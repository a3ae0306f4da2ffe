use std::collections::HashMap;
use std::sync::RwLock;

use procura_core::{AggregateId, ExpectedVersion, TenantId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store.
///
/// One write lock covers the version check and the append, so two writers
/// holding the same stale version cannot both commit.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    /// All events of a batch must share tenant, aggregate and aggregate type.
    fn batch_key(events: &[UncommittedEvent]) -> Result<(StreamKey, &str), EventStoreError> {
        let first = &events[0];
        for (idx, e) in events.iter().enumerate().skip(1) {
            if e.tenant_id != first.tenant_id {
                return Err(EventStoreError::TenantIsolation(format!(
                    "batch contains multiple tenant_ids (index {idx})"
                )));
            }
            if e.aggregate_id != first.aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != first.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }
        let key = StreamKey {
            tenant_id: first.tenant_id,
            aggregate_id: first.aggregate_id,
        };
        Ok((key, first.aggregate_type.as_str()))
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }
        let (key, aggregate_type) = Self::batch_key(&events)?;
        let aggregate_type = aggregate_type.to_string();

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("event store lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, sequence_number)| StoredEvent::committed_at(e, sequence_number))
            .collect();

        stream.extend(committed.iter().cloned());
        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("event store lock poisoned".to_string()))?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn event(tenant_id: TenantId, aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "procurement.rfq.created".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "title": "Stationery" }),
        }
    }

    #[test]
    fn append_assigns_consecutive_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        let first = store
            .append(
                vec![
                    event(tenant_id, aggregate_id, "procurement.rfq"),
                    event(tenant_id, aggregate_id, "procurement.rfq"),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
        assert_eq!(first.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![1, 2]);

        let next = store
            .append(vec![event(tenant_id, aggregate_id, "procurement.rfq")], ExpectedVersion::Exact(2))
            .unwrap();
        assert_eq!(next[0].sequence_number, 3);
        assert_eq!(store.load_stream(tenant_id, aggregate_id).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_rejected() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();
        store
            .append(vec![event(tenant_id, aggregate_id, "procurement.rfq")], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![event(tenant_id, aggregate_id, "procurement.rfq")], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    #[test]
    fn streams_are_tenant_scoped() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        store
            .append(vec![event(TenantId::new(), aggregate_id, "procurement.rfq")], ExpectedVersion::Exact(0))
            .unwrap();

        assert!(store.load_stream(TenantId::new(), aggregate_id).unwrap().is_empty());
    }

    #[test]
    fn mixed_batches_and_type_changes_are_rejected() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        let err = store
            .append(
                vec![
                    event(tenant_id, aggregate_id, "procurement.rfq"),
                    event(TenantId::new(), aggregate_id, "procurement.rfq"),
                ],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::TenantIsolation(_)));

        store
            .append(vec![event(tenant_id, aggregate_id, "procurement.rfq")], ExpectedVersion::Any)
            .unwrap();
        let err = store
            .append(vec![event(tenant_id, aggregate_id, "procurement.order")], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }
}
