//! Command execution pipeline (application-level orchestration).
//!
//! One consistent lifecycle for every aggregate command:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (tenant-scoped)
//!   ↓
//! 2. Rehydrate aggregate (apply historical events)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus (projections, workers)
//! ```
//!
//! Events are persisted before publication; a publish failure after a
//! successful append surfaces as [`DispatchError::Publish`] and retrying the
//! publication is safe (at-least-once delivery).

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use wrenchflow_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, TenantId};
use wrenchflow_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure: the stream moved under the writer.
    /// Callers reload and re-execute (or surface a conflict).
    StaleWrite(String),
    /// Tenant isolation violation (cross-tenant or cross-aggregate stream mixing).
    TenantIsolation(String),
    /// Deterministic domain failure, carrying the full taxonomy
    /// (invalid amounts, missing line items, archived work orders, ...).
    Domain(DomainError),
    /// Failed to deserialize historical event payloads into the aggregate event type.
    Deserialize(String),
    /// The event store could not serve the request.
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::StaleWrite(msg) => DispatchError::StaleWrite(msg.clone()),
            EventStoreError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        DispatchError::Domain(value)
    }
}

/// Load a stream and rebuild the aggregate's current state from it.
///
/// Shared by [`CommandDispatcher::dispatch`] and read paths that need the
/// aggregate without issuing a command (invoice generation, summaries).
pub fn load_aggregate<A, S>(
    store: &S,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
) -> Result<(A, u64), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
    S: EventStore,
{
    let history = store.load_stream(tenant_id, aggregate_id)?;
    validate_loaded_stream(tenant_id, aggregate_id, &history)?;
    let version = stream_version(&history);

    let mut aggregate = make_aggregate(tenant_id, aggregate_id);
    apply_history::<A>(&mut aggregate, &history)?;

    Ok((aggregate, version))
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Sits between callers (application services) and the infrastructure
/// (event store, event bus). Generic over both so tests run fully in-memory
/// and production can swap in durable backends without touching domain code.
///
/// Aggregates used here must be deterministic, side-effect free, and track
/// their version in `apply()` (+1 per event).
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Rehydrate an aggregate without dispatching a command.
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
        load_aggregate(&self.store, tenant_id, aggregate_id, make_aggregate).map(|(a, _)| a)
    }

    /// Dispatch a command through the full pipeline.
    ///
    /// Returns the committed [`StoredEvent`]s (with assigned sequence
    /// numbers). The append is guarded by the stream version observed at
    /// load time, so a concurrent writer surfaces as
    /// [`DispatchError::StaleWrite`] rather than a lost update.
    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: wrenchflow_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history (tenant-scoped) and rehydrate.
        let (aggregate, version) =
            load_aggregate(&self.store, tenant_id, aggregate_id, make_aggregate)?;
        let expected = ExpectedVersion::Exact(version);

        // 2) Decide events (no mutation).
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 3) Persist (append-only, optimistic).
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

        // 4) Publish committed events (after append).
        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
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
    // Enforce tenant isolation even if a buggy backend returns cross-tenant data.
    // Also ensure the stream is monotonically increasing by sequence number.
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
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
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
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
