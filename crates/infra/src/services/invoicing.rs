//! Invoicing application service.
//!
//! Resolves the supersedes chain against the archive, freezes the ledger
//! through the composer, stores the snapshot, and publishes the generation
//! event. Also hosts the auto-invoicer that reacts to completions.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use wrenchflow_core::{AggregateId, DomainError, TaxRate, TenantId};
use wrenchflow_events::{Event, EventBus, EventEnvelope};
use wrenchflow_invoicing::{Invoice, InvoiceComposer, InvoiceEvent, InvoiceId};
use wrenchflow_workorders::{WorkOrder, WorkOrderEvent, WorkOrderId, WorkOrderStatus};

use crate::command_dispatcher::{load_aggregate, DispatchError};
use crate::event_store::EventStore;
use crate::invoice_archive::{ArchiveError, InvoiceArchive};
use crate::services::{INVOICE_STREAM, WORK_ORDER_STREAM};
use crate::workers::{EventWorker, WorkerHandle};

#[derive(Debug)]
pub enum InvoicingError {
    /// Loading the work order failed (store or stream problems).
    Dispatch(DispatchError),
    /// Deterministic domain failure (`EmptyLineItems`, `NotFound`, ...).
    Domain(DomainError),
    /// The invoice archive could not serve the request.
    Archive(ArchiveError),
    /// Publication failed after the snapshot was archived.
    Publish(String),
}

impl From<DispatchError> for InvoicingError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(e) => InvoicingError::Domain(e),
            other => InvoicingError::Dispatch(other),
        }
    }
}

impl From<DomainError> for InvoicingError {
    fn from(value: DomainError) -> Self {
        InvoicingError::Domain(value)
    }
}

impl From<ArchiveError> for InvoicingError {
    fn from(value: ArchiveError) -> Self {
        InvoicingError::Archive(value)
    }
}

pub struct InvoicingService<S, B, A> {
    store: S,
    bus: B,
    archive: A,
}

impl<S, B, A> InvoicingService<S, B, A>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    A: InvoiceArchive,
{
    pub fn new(store: S, bus: B, archive: A) -> Self {
        Self { store, bus, archive }
    }

    /// Generate an immutable snapshot of the work order's ledger.
    ///
    /// Uses the work order's own tax rate unless the caller overrides it.
    /// A prior invoice for the same work order is superseded, not replaced:
    /// both snapshots stay in the archive.
    pub fn generate(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        tax_rate: Option<TaxRate>,
    ) -> Result<Invoice, InvoicingError> {
        let (order, _) = load_aggregate(&self.store, tenant_id, work_order_id.0, |_, id| {
            WorkOrder::empty(WorkOrderId::new(id))
        })?;
        if order.tenant_id().is_none() {
            return Err(DomainError::NotFound.into());
        }

        let rate = tax_rate.unwrap_or_else(|| order.tax_rate());
        let supersedes = self
            .archive
            .latest_for_work_order(tenant_id, work_order_id)?
            .map(|prior| prior.id());

        let invoice = InvoiceComposer::generate(
            &order,
            rate,
            supersedes,
            InvoiceId::new(AggregateId::new()),
            chrono::Utc::now(),
        )?;

        self.archive.save(invoice.clone())?;

        let event = InvoiceEvent::generated(&invoice);
        let payload =
            serde_json::to_value(&event).map_err(|e| InvoicingError::Publish(e.to_string()))?;
        let envelope = EventEnvelope {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id: invoice.id().0,
            aggregate_type: INVOICE_STREAM.to_string(),
            sequence_number: 1,
            event_type: event.event_type().to_string(),
            occurred_at: invoice.generated_at(),
            payload,
        };
        self.bus
            .publish(envelope)
            .map_err(|e| InvoicingError::Publish(format!("{e:?}")))?;

        info!(
            %work_order_id,
            invoice_id = %invoice.id(),
            total = %invoice.total(),
            superseded = ?invoice.supersedes(),
            "generated invoice"
        );
        Ok(invoice)
    }

    /// Full generation history for a work order, oldest first.
    pub fn history(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<Invoice>, InvoicingError> {
        Ok(self.archive.list_for_work_order(tenant_id, work_order_id)?)
    }
}

/// The work order behind an envelope, when it records a move into `Completed`.
pub fn completed_work_order(envelope: &EventEnvelope<JsonValue>) -> Option<WorkOrderId> {
    // Cheap route check on the envelope metadata before touching the payload.
    if envelope.aggregate_type != WORK_ORDER_STREAM
        || envelope.event_type != "workorders.order.status_changed"
    {
        return None;
    }
    let ev: WorkOrderEvent = serde_json::from_value(envelope.payload.clone()).ok()?;
    match ev {
        WorkOrderEvent::StatusChanged(e) if e.new_status == WorkOrderStatus::Completed => {
            Some(e.work_order_id)
        }
        _ => None,
    }
}

impl<S, B, A> InvoicingService<S, B, A>
where
    S: EventStore + 'static,
    B: EventBus<EventEnvelope<JsonValue>> + 'static,
    A: InvoiceArchive + 'static,
{
    /// Spawn a worker that invoices every work order the moment it completes.
    ///
    /// Idempotent per delivery only in the at-least-once sense: a replayed
    /// completion produces a superseding snapshot, not a duplicate record of
    /// the same id.
    pub fn spawn_auto_invoicer<WB>(service: Arc<Self>, bus: WB) -> WorkerHandle
    where
        WB: EventBus<EventEnvelope<JsonValue>> + Send + Sync + 'static,
    {
        EventWorker::spawn(
            "auto-invoicer",
            bus,
            None,
            move |envelope: EventEnvelope<JsonValue>| {
                if let Some(work_order_id) = completed_work_order(&envelope) {
                    service
                        .generate(envelope.tenant_id, work_order_id, None)
                        .map_err(|e| format!("{e:?}"))?;
                }
                Ok::<(), String>(())
            },
        )
    }
}
