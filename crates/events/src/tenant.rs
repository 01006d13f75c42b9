use wrenchflow_core::TenantId;

use crate::EventEnvelope;

/// Helper trait for tenant-scoped messages.
///
/// Marks types that carry a tenant id, so workers and subscription loops can
/// be pinned to one shop and ignore everything else (defense in depth on top
/// of store-level isolation).
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl<E> TenantScoped for EventEnvelope<E> {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
