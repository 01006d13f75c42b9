use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wrenchflow_core::{AggregateId, DomainError, DomainResult, TaxRate, TenantId};
use wrenchflow_events::Event;
use wrenchflow_workorders::{LineItem, WorkOrder, WorkOrderId};

/// Invoice identifier (tenant-scoped via `tenant_id` fields in events).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Immutable billing snapshot of one work order at a point in time.
///
/// Once generated, the captured line items and totals never change; a later
/// edit to the work order requires a new snapshot, which `supersedes` the
/// prior one. Prior snapshots are retained (audit trail), never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    tenant_id: TenantId,
    work_order_id: WorkOrderId,
    line_items: Vec<LineItem>,
    subtotal: Decimal,
    tax_rate: TaxRate,
    tax_amount: Decimal,
    total: Decimal,
    generated_at: DateTime<Utc>,
    supersedes: Option<InvoiceId>,
}

impl Invoice {
    pub fn id(&self) -> InvoiceId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn work_order_id(&self) -> WorkOrderId {
        self.work_order_id
    }

    /// The line items as they stood at generation time (copied, not shared).
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Back-reference to the invoice this snapshot replaces, if any.
    pub fn supersedes(&self) -> Option<InvoiceId> {
        self.supersedes
    }
}

/// Produces immutable [`Invoice`] snapshots from a work order's ledger.
///
/// Pure and deterministic: identifiers and the generation timestamp are
/// passed in by the caller. Resolving `supersedes` against previously stored
/// invoices is the application layer's job.
pub struct InvoiceComposer;

impl InvoiceComposer {
    pub fn generate(
        work_order: &WorkOrder,
        tax_rate: TaxRate,
        supersedes: Option<InvoiceId>,
        invoice_id: InvoiceId,
        generated_at: DateTime<Utc>,
    ) -> DomainResult<Invoice> {
        let tenant_id = work_order.tenant_id().ok_or(DomainError::NotFound)?;

        // An invoice with nothing to bill is not meaningful.
        if work_order.line_items().is_empty() {
            return Err(DomainError::EmptyLineItems);
        }

        let subtotal = work_order.subtotal();
        let tax_amount = tax_rate.tax_on(subtotal);
        let total = subtotal + tax_amount;

        Ok(Invoice {
            id: invoice_id,
            tenant_id,
            work_order_id: work_order.id_typed(),
            line_items: work_order.line_items().to_vec(),
            subtotal,
            tax_rate,
            tax_amount,
            total,
            generated_at,
            supersedes,
        })
    }
}

/// Event: InvoiceGenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceGenerated {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub work_order_id: WorkOrderId,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub supersedes: Option<InvoiceId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceGenerated(InvoiceGenerated),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceGenerated(_) => "invoicing.invoice.generated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceGenerated(e) => e.occurred_at,
        }
    }
}

impl InvoiceEvent {
    /// Build the publication event for a freshly generated invoice.
    pub fn generated(invoice: &Invoice) -> Self {
        InvoiceEvent::InvoiceGenerated(InvoiceGenerated {
            tenant_id: invoice.tenant_id(),
            invoice_id: invoice.id(),
            work_order_id: invoice.work_order_id(),
            subtotal: invoice.subtotal(),
            tax_amount: invoice.tax_amount(),
            total: invoice.total(),
            supersedes: invoice.supersedes(),
            occurred_at: invoice.generated_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wrenchflow_core::{Aggregate, AggregateId, TenantId};
    use wrenchflow_workorders::{
        AddLineItem, LineItemChange, LineItemId, LineItemKind, OpenWorkOrder, UpdateLineItem,
        WorkOrderCommand,
    };

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_work_order_id() -> WorkOrderId {
        WorkOrderId::new(AggregateId::new())
    }

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_rate() -> TaxRate {
        TaxRate::new(dec!(0.085)).unwrap()
    }

    fn open_order(tenant_id: TenantId, work_order_id: WorkOrderId) -> WorkOrder {
        let mut order = WorkOrder::empty(work_order_id);
        let events = order
            .handle(&WorkOrderCommand::OpenWorkOrder(OpenWorkOrder {
                tenant_id,
                work_order_id,
                customer_id: None,
                vehicle_id: None,
                tax_rate: None,
                priority: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);
        order
    }

    fn add_item(order: &mut WorkOrder, description: &str, quantity: Decimal, unit_price: Decimal) {
        let events = order
            .handle(&WorkOrderCommand::AddLineItem(AddLineItem {
                tenant_id: order.tenant_id().unwrap(),
                work_order_id: order.id_typed(),
                line_item_id: LineItemId::new(),
                kind: LineItemKind::Labor,
                description: description.to_string(),
                quantity,
                unit_price,
                source_part_id: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);
    }

    #[test]
    fn empty_ledger_cannot_be_invoiced() {
        let order = open_order(test_tenant_id(), test_work_order_id());
        let err = InvoiceComposer::generate(
            &order,
            test_rate(),
            None,
            test_invoice_id(),
            test_time(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::EmptyLineItems);
    }

    #[test]
    fn snapshot_captures_items_and_totals() {
        let mut order = open_order(test_tenant_id(), test_work_order_id());
        add_item(&mut order, "Oil Change", dec!(1), dec!(45.99));
        add_item(&mut order, "Oil Filter", dec!(1), dec!(12.99));
        add_item(&mut order, "Motor Oil", dec!(5), dec!(3.50));

        let invoice = InvoiceComposer::generate(
            &order,
            test_rate(),
            None,
            test_invoice_id(),
            test_time(),
        )
        .unwrap();

        assert_eq!(invoice.work_order_id(), order.id_typed());
        assert_eq!(invoice.line_items().len(), 3);
        assert_eq!(invoice.subtotal(), dec!(76.48));
        assert_eq!(invoice.tax_amount(), dec!(6.50));
        assert_eq!(invoice.total(), dec!(82.98));
        assert_eq!(invoice.supersedes(), None);
    }

    #[test]
    fn regeneration_supersedes_and_leaves_the_first_snapshot_unchanged() {
        let mut order = open_order(test_tenant_id(), test_work_order_id());
        add_item(&mut order, "Oil Change", dec!(1), dec!(45.99));

        let first = InvoiceComposer::generate(
            &order,
            test_rate(),
            None,
            test_invoice_id(),
            test_time(),
        )
        .unwrap();
        let first_before = first.clone();

        // The ledger keeps moving after the first snapshot.
        add_item(&mut order, "Air Filter", dec!(1), dec!(24.99));
        let id = order.line_items()[0].id;
        let events = order
            .handle(&WorkOrderCommand::UpdateLineItem(UpdateLineItem {
                tenant_id: order.tenant_id().unwrap(),
                work_order_id: order.id_typed(),
                line_item_id: id,
                change: LineItemChange::SetUnitPrice(dec!(49.99)),
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);

        let second = InvoiceComposer::generate(
            &order,
            test_rate(),
            Some(first.id()),
            test_invoice_id(),
            test_time(),
        )
        .unwrap();

        assert_eq!(second.supersedes(), Some(first.id()));
        assert_eq!(second.subtotal(), dec!(74.98));
        // The first snapshot is untouched by the later edits.
        assert_eq!(first, first_before);
        assert_eq!(first.subtotal(), dec!(45.99));
        assert_eq!(first.line_items().len(), 1);
    }

    #[test]
    fn generated_event_mirrors_the_snapshot() {
        let mut order = open_order(test_tenant_id(), test_work_order_id());
        add_item(&mut order, "Coolant Flush", dec!(1), dec!(89.00));

        let invoice = InvoiceComposer::generate(
            &order,
            test_rate(),
            None,
            test_invoice_id(),
            test_time(),
        )
        .unwrap();

        match InvoiceEvent::generated(&invoice) {
            InvoiceEvent::InvoiceGenerated(e) => {
                assert_eq!(e.invoice_id, invoice.id());
                assert_eq!(e.work_order_id, invoice.work_order_id());
                assert_eq!(e.subtotal, dec!(89.00));
                assert_eq!(e.tax_amount, dec!(7.57));
                assert_eq!(e.total, dec!(96.57));
            }
        }
    }
}
