use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wrenchflow_core::{AggregateId, TenantId};

/// A committed event as the bus carries it: payload plus routing metadata.
///
/// Everything a consumer needs to file or skip the message rides outside the
/// payload — which shop it belongs to, which stream produced it, where in
/// that stream it sits, what kind of event it is and when it happened — so
/// projections and workers can route without deserializing.
///
/// Envelopes describe events that were already appended to the store; the
/// `sequence_number` is the store-assigned stream position and doubles as
/// the consumer-side idempotency cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,

    /// Which shop. Streams and read models never mix tenants.
    pub tenant_id: TenantId,

    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Position in the aggregate stream; monotonically increasing.
    pub sequence_number: u64,

    /// Stable dotted event name, e.g. `workorders.order.status_changed`.
    pub event_type: String,

    /// Business time of the underlying event.
    pub occurred_at: DateTime<Utc>,

    pub payload: E,
}
