//! Command execution pipeline for the event-sourced procurement aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (tenant-scoped)
//!   ↓
//! 2. Rehydrate aggregate
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Append with ExpectedVersion::Exact(loaded version)
//!   ↓
//! 5. Publish committed events to the bus
//! ```
//!
//! Step 4 is the transaction boundary: a command decided on a stale read
//! fails with [`DispatchError::Concurrency`] and nothing is published.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use procura_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, TenantId};
use procura_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Business rule failure, surfaced unmodified.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Optimistic concurrency failure (stale aggregate version).
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// Cross-tenant or cross-aggregate stream mixing.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// Historical payload could not be read back as the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),

    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// Result of a successful dispatch: the aggregate after the new events and
/// the events as committed.
#[derive(Debug)]
pub struct Dispatched<A> {
    pub aggregate: A,
    pub committed: Vec<StoredEvent>,
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Generic over the store and bus so tests and the demo run on the
/// in-memory implementations.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Rehydrate an aggregate from its stream without deciding anything.
    ///
    /// A missing stream yields the fresh aggregate from `make_aggregate`;
    /// callers check existence through the aggregate itself.
    pub fn load<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(tenant_id, aggregate_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// Load, decide, append (optimistically) and publish.
    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Dispatched<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: procura_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(tenant_id, aggregate_id);
        apply_history(&mut aggregate, &history)?;

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(Dispatched {
                aggregate,
                committed: vec![],
            });
        }

        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    tenant_id,
                    aggregate_id,
                    aggregate_type.clone(),
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;
        tracing::debug!(
            %tenant_id,
            %aggregate_id,
            aggregate_type = %aggregate_type,
            events = committed.len(),
            version = stream_version(&committed),
            "events committed"
        );

        for ev in &decided {
            aggregate.apply(ev);
        }

        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(Dispatched {
            aggregate,
            committed,
        })
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.tenant_id != tenant_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong tenant_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}
