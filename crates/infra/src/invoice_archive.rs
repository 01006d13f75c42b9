//! Invoice persistence collaborator.
//!
//! Invoices are immutable snapshots; the archive only ever gains records.
//! Superseded invoices stay queryable (audit trail).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use wrenchflow_core::TenantId;
use wrenchflow_invoicing::{Invoice, InvoiceId};
use wrenchflow_workorders::WorkOrderId;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The backing storage could not serve the request.
    #[error("invoice archive unavailable: {0}")]
    Unavailable(String),
}

/// Tenant-scoped invoice persistence.
pub trait InvoiceArchive: Send + Sync {
    /// Store a snapshot. Never overwrites: each invoice id is a new record.
    fn save(&self, invoice: Invoice) -> Result<(), ArchiveError>;

    fn get(&self, tenant_id: TenantId, invoice_id: InvoiceId)
        -> Result<Option<Invoice>, ArchiveError>;

    /// The most recently generated invoice for a work order, if any;
    /// this is what a re-generation supersedes.
    fn latest_for_work_order(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<Option<Invoice>, ArchiveError>;

    /// Full generation history for a work order, oldest first.
    fn list_for_work_order(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<Invoice>, ArchiveError>;
}

impl<A> InvoiceArchive for Arc<A>
where
    A: InvoiceArchive + ?Sized,
{
    fn save(&self, invoice: Invoice) -> Result<(), ArchiveError> {
        (**self).save(invoice)
    }

    fn get(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Option<Invoice>, ArchiveError> {
        (**self).get(tenant_id, invoice_id)
    }

    fn latest_for_work_order(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<Option<Invoice>, ArchiveError> {
        (**self).latest_for_work_order(tenant_id, work_order_id)
    }

    fn list_for_work_order(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<Invoice>, ArchiveError> {
        (**self).list_for_work_order(tenant_id, work_order_id)
    }
}

/// In-memory invoice archive for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceArchive {
    // Generation order per work order; latest is the last entry.
    by_work_order: RwLock<HashMap<(TenantId, WorkOrderId), Vec<Invoice>>>,
}

impl InMemoryInvoiceArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InvoiceArchive for InMemoryInvoiceArchive {
    fn save(&self, invoice: Invoice) -> Result<(), ArchiveError> {
        let mut map = self
            .by_work_order
            .write()
            .map_err(|_| ArchiveError::Unavailable("lock poisoned".to_string()))?;
        map.entry((invoice.tenant_id(), invoice.work_order_id()))
            .or_default()
            .push(invoice);
        Ok(())
    }

    fn get(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Option<Invoice>, ArchiveError> {
        let map = self
            .by_work_order
            .read()
            .map_err(|_| ArchiveError::Unavailable("lock poisoned".to_string()))?;
        Ok(map
            .iter()
            .filter(|((t, _), _)| *t == tenant_id)
            .flat_map(|(_, invoices)| invoices.iter())
            .find(|inv| inv.id() == invoice_id)
            .cloned())
    }

    fn latest_for_work_order(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<Option<Invoice>, ArchiveError> {
        let map = self
            .by_work_order
            .read()
            .map_err(|_| ArchiveError::Unavailable("lock poisoned".to_string()))?;
        Ok(map
            .get(&(tenant_id, work_order_id))
            .and_then(|invoices| invoices.last())
            .cloned())
    }

    fn list_for_work_order(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<Invoice>, ArchiveError> {
        let map = self
            .by_work_order
            .read()
            .map_err(|_| ArchiveError::Unavailable("lock poisoned".to_string()))?;
        Ok(map
            .get(&(tenant_id, work_order_id))
            .cloned()
            .unwrap_or_default())
    }
}
