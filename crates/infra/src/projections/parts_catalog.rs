use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use wrenchflow_core::{AggregateId, DomainError, DomainResult, TenantId};
use wrenchflow_events::EventEnvelope;
use wrenchflow_inventory::{InventoryLookup, PartEvent, PartId, PartSummary};

use crate::read_model::TenantStore;

/// Tenant+aggregate cursor to support at-least-once delivery (idempotent projection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum PartsCatalogError {
    #[error("failed to deserialize part event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Parts catalog projection.
///
/// Consumes published part-event envelopes and maintains the tenant-isolated
/// [`PartSummary`] read model the work-order side resolves parts against.
/// It also answers [`InventoryLookup`] directly, so the catalog read model
/// IS the lookup collaborator in a single-process deployment.
#[derive(Debug)]
pub struct PartsCatalogProjection<S>
where
    S: TenantStore<PartId, PartSummary>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> PartsCatalogProjection<S>
where
    S: TenantStore<PartId, PartSummary>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Query the read model for one tenant/part.
    pub fn get(&self, tenant_id: TenantId, part_id: &PartId) -> Option<PartSummary> {
        self.store.get(tenant_id, part_id)
    }

    /// List the whole catalog for a tenant (disposable read model).
    pub fn list(&self, tenant_id: TenantId) -> Vec<PartSummary> {
        self.store.list(tenant_id)
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces tenant isolation
    /// - Enforces monotonic sequence per (tenant, aggregate) stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), PartsCatalogError> {
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
                return Err(PartsCatalogError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                // First event may land at any positive sequence; after that
                // we enforce strict monotonic increments.
                return Err(PartsCatalogError::NonMonotonicSequence { last, found: seq });
            }

            let ev: PartEvent = serde_json::from_value(envelope.payload.clone())
                .map_err(|e| PartsCatalogError::Deserialize(e.to_string()))?;

            // Validate tenant isolation at the event level.
            let (event_tenant, part_id) = match &ev {
                PartEvent::PartCreated(e) => (e.tenant_id, e.part_id),
                PartEvent::StockAdjusted(e) => (e.tenant_id, e.part_id),
                PartEvent::SellPriceChanged(e) => (e.tenant_id, e.part_id),
            };

            if event_tenant != tenant_id {
                return Err(PartsCatalogError::TenantIsolation(
                    "event tenant_id does not match envelope tenant_id".to_string(),
                ));
            }

            if part_id.0 != aggregate_id {
                return Err(PartsCatalogError::TenantIsolation(
                    "event part_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match ev {
                PartEvent::PartCreated(e) => {
                    self.store.upsert(
                        tenant_id,
                        e.part_id,
                        PartSummary {
                            part_id: e.part_id,
                            name: e.name,
                            part_number: e.part_number,
                            sell_price: e.sell_price,
                            quantity_on_hand: rust_decimal::Decimal::ZERO,
                        },
                    );
                }
                PartEvent::StockAdjusted(e) => {
                    if let Some(mut summary) = self.store.get(tenant_id, &e.part_id) {
                        summary.quantity_on_hand += e.delta;
                        self.store.upsert(tenant_id, e.part_id, summary);
                    }
                }
                PartEvent::SellPriceChanged(e) => {
                    if let Some(mut summary) = self.store.get(tenant_id, &e.part_id) {
                        summary.sell_price = e.sell_price;
                        self.store.upsert(tenant_id, e.part_id, summary);
                    }
                }
            }

            // Advance cursor after successful apply.
            cursors.insert(key, seq);
        }

        Ok(())
    }
}

#[async_trait]
impl<S> InventoryLookup for PartsCatalogProjection<S>
where
    S: TenantStore<PartId, PartSummary>,
{
    async fn find_part(&self, tenant_id: TenantId, part_id: PartId) -> DomainResult<PartSummary> {
        self.get(tenant_id, &part_id)
            .ok_or_else(|| DomainError::PartNotFound(Uuid::from(part_id.0)))
    }

    async fn search_parts(
        &self,
        tenant_id: TenantId,
        query: &str,
    ) -> DomainResult<Vec<PartSummary>> {
        let needle = query.to_lowercase();
        Ok(self
            .list(tenant_id)
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.part_number.to_lowercase().contains(&needle)
            })
            .collect())
    }
}
