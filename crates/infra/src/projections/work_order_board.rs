use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use wrenchflow_core::{Aggregate, AggregateId, TenantId};
use wrenchflow_events::EventEnvelope;
use wrenchflow_workorders::{
    WorkOrder, WorkOrderEvent, WorkOrderId, WorkOrderPriority, WorkOrderStatus,
};

use crate::read_model::TenantStore;

/// One row of the shop's work-order board (and the customer status portal):
/// where the order stands and what it currently totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderSummary {
    pub work_order_id: WorkOrderId,
    pub status: WorkOrderStatus,
    pub priority: WorkOrderPriority,
    pub line_item_count: usize,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub customer_id: Option<AggregateId>,
    pub vehicle_id: Option<AggregateId>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkOrderSummary {
    fn from_order(order: &WorkOrder) -> Self {
        Self {
            work_order_id: order.id_typed(),
            status: order.status(),
            priority: order.priority(),
            line_item_count: order.line_items().len(),
            subtotal: order.subtotal(),
            total: order.total(order.tax_rate()),
            customer_id: order.customer_id(),
            vehicle_id: order.vehicle_id(),
            completed_at: order.actual_completion_at(),
        }
    }
}

/// Tenant+aggregate cursor to support at-least-once delivery (idempotent projection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum WorkOrderBoardError {
    #[error("failed to deserialize work order event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Work-order board projection.
///
/// Keeps a rehydrated copy of each work order as the read model and derives
/// [`WorkOrderSummary`] rows on query, so the board never re-implements the
/// ledger arithmetic. Disposable and rebuildable from the event streams.
#[derive(Debug)]
pub struct WorkOrderBoardProjection<S>
where
    S: TenantStore<WorkOrderId, WorkOrder>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> WorkOrderBoardProjection<S>
where
    S: TenantStore<WorkOrderId, WorkOrder>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Current summary for one work order.
    pub fn get(&self, tenant_id: TenantId, work_order_id: &WorkOrderId) -> Option<WorkOrderSummary> {
        self.store
            .get(tenant_id, work_order_id)
            .map(|order| WorkOrderSummary::from_order(&order))
    }

    /// Every work order the shop currently tracks, archived ones included.
    pub fn list(&self, tenant_id: TenantId) -> Vec<WorkOrderSummary> {
        self.store
            .list(tenant_id)
            .iter()
            .map(WorkOrderSummary::from_order)
            .collect()
    }

    /// Apply a published envelope into the projection.
    ///
    /// Same discipline as the catalog projection: tenant isolation, strict
    /// monotonic sequencing per stream, and replay tolerance.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), WorkOrderBoardError> {
        let tenant_id = envelope.tenant_id;
        let aggregate_id = envelope.aggregate_id;
        let seq = envelope.sequence_number;

        if let Ok(mut cursors) = self.cursors.write() {
            let key = CursorKey {
                tenant_id,
                aggregate_id,
            };
            let last = *cursors.get(&key).unwrap_or(&0);

            if seq == 0 {
                return Err(WorkOrderBoardError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                return Err(WorkOrderBoardError::NonMonotonicSequence { last, found: seq });
            }

            let ev: WorkOrderEvent = serde_json::from_value(envelope.payload.clone())
                .map_err(|e| WorkOrderBoardError::Deserialize(e.to_string()))?;

            let (event_tenant, work_order_id) = match &ev {
                WorkOrderEvent::WorkOrderOpened(e) => (e.tenant_id, e.work_order_id),
                WorkOrderEvent::LineItemAdded(e) => (e.tenant_id, e.work_order_id),
                WorkOrderEvent::LineItemUpdated(e) => (e.tenant_id, e.work_order_id),
                WorkOrderEvent::LineItemRemoved(e) => (e.tenant_id, e.work_order_id),
                WorkOrderEvent::StatusChanged(e) => (e.tenant_id, e.work_order_id),
                WorkOrderEvent::PriorityChanged(e) => (e.tenant_id, e.work_order_id),
            };

            if event_tenant != tenant_id {
                return Err(WorkOrderBoardError::TenantIsolation(
                    "event tenant_id does not match envelope tenant_id".to_string(),
                ));
            }

            if work_order_id.0 != aggregate_id {
                return Err(WorkOrderBoardError::TenantIsolation(
                    "event work_order_id does not match envelope aggregate_id".to_string(),
                ));
            }

            // Evolve the stored order through the aggregate's own apply();
            // the board carries no arithmetic of its own.
            let mut order = self
                .store
                .get(tenant_id, &work_order_id)
                .unwrap_or_else(|| WorkOrder::empty(work_order_id));
            order.apply(&ev);
            self.store.upsert(tenant_id, work_order_id, order);

            // Advance cursor after successful apply.
            cursors.insert(key, seq);
        }

        Ok(())
    }
}
