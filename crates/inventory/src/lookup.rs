//! Parts lookup collaborator boundary.
//!
//! The work-order side binds parts into line items through this trait; it
//! never touches part aggregates directly. Implementations answer from a
//! read model, a remote catalog service, or a test fixture.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wrenchflow_core::{DomainResult, TenantId};

use crate::part::PartId;

/// Snapshot of one part as the catalog currently knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSummary {
    pub part_id: PartId,
    pub name: String,
    pub part_number: String,
    pub sell_price: Decimal,
    pub quantity_on_hand: Decimal,
}

/// Requested quantity exceeds what the shop has on hand.
///
/// This is a warning, not a failure: shops routinely backorder. Callers
/// decide whether to block on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortage {
    pub part_id: PartId,
    pub requested: Decimal,
    pub on_hand: Decimal,
}

impl PartSummary {
    /// Shortage for a requested quantity, if any.
    pub fn shortage_for(&self, requested: Decimal) -> Option<StockShortage> {
        if requested > self.quantity_on_hand {
            Some(StockShortage {
                part_id: self.part_id,
                requested,
                on_hand: self.quantity_on_hand,
            })
        } else {
            None
        }
    }
}

/// Read-side collaborator for resolving parts.
///
/// A single request/response call; it holds no lock on any work-order stream
/// while in flight. Failures propagate to the caller for retry.
#[async_trait]
pub trait InventoryLookup: Send + Sync {
    /// Resolve one part. Fails with `DomainError::PartNotFound` on a miss.
    async fn find_part(&self, tenant_id: TenantId, part_id: PartId) -> DomainResult<PartSummary>;

    /// Case-insensitive search over name and part number.
    async fn search_parts(&self, tenant_id: TenantId, query: &str)
        -> DomainResult<Vec<PartSummary>>;
}

#[async_trait]
impl<L> InventoryLookup for std::sync::Arc<L>
where
    L: InventoryLookup + ?Sized,
{
    async fn find_part(&self, tenant_id: TenantId, part_id: PartId) -> DomainResult<PartSummary> {
        (**self).find_part(tenant_id, part_id).await
    }

    async fn search_parts(
        &self,
        tenant_id: TenantId,
        query: &str,
    ) -> DomainResult<Vec<PartSummary>> {
        (**self).search_parts(tenant_id, query).await
    }
}
