use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use procura_core::{AggregateId, ExpectedVersion, TenantId};
use std::sync::Arc;

/// A decided procurement event, serialized and waiting for its stream position.
///
/// Built from a typed domain event with [`UncommittedEvent::from_typed`], which
/// captures `event_type`, schema version and business time next to the JSON
/// payload so the stream can be replayed without the typed event at hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    /// e.g. `procurement.rfq`, `procurement.order`.
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// An event persisted at a fixed position in its stream.
///
/// Sequence numbers start at 1, have no gaps, and are scoped to
/// `(tenant_id, aggregate_id)`. The last one is the aggregate version used for
/// optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Place an uncommitted event at `sequence_number` in its stream.
    pub fn committed_at(event: UncommittedEvent, sequence_number: u64) -> Self {
        Self {
            event_id: event.event_id,
            tenant_id: event.tenant_id,
            aggregate_id: event.aggregate_id,
            aggregate_type: event.aggregate_type,
            sequence_number,
            event_type: event.event_type,
            event_version: event.event_version,
            occurred_at: event.occurred_at,
            payload: event.payload,
        }
    }

    /// Convert a stored event into a tenant-scoped event envelope for publication.
    pub fn to_envelope(&self) -> procura_events::EventEnvelope<JsonValue> {
        procura_events::EventEnvelope::new(
            self.event_id,
            self.tenant_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// Event store failure (infrastructure, not business rules).
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Another writer committed to the stream since it was read.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),
}

/// Append-only, tenant-scoped event store.
///
/// `append` is all-or-nothing for a batch: every event must target the same
/// tenant, aggregate and aggregate type, and the stream must be at
/// `expected_version`. This is the storage transaction boundary for every
/// procurement operation.
///
/// `load_stream` returns events in sequence order, or an empty vector for a
/// stream that does not exist yet.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(tenant_id, aggregate_id)
    }
}

impl UncommittedEvent {
    pub fn from_typed<E>(
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: procura_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
