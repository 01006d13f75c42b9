//! Work-order application service.
//!
//! Orchestrates the WorkOrder aggregate against the collaborators: resolves
//! parts through [`InventoryLookup`] before binding them into the ledger,
//! and pushes best-effort status notifications after transitions.

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use wrenchflow_core::{AggregateId, DomainError, TenantId, UserId};
use wrenchflow_events::{EventBus, EventEnvelope};
use wrenchflow_inventory::{InventoryLookup, PartId, StockShortage};
use wrenchflow_workorders::{
    AddLineItem, ChangeStatus, LineItemChange, LineItemId, LineItemKind, OpenWorkOrder,
    OverrideStatus, RemoveLineItem, SetPriority, UpdateLineItem, WorkOrder, WorkOrderCommand,
    WorkOrderId, WorkOrderPriority, WorkOrderStatus,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::{BillingConfig, StockPolicy};
use crate::event_store::EventStore;
use crate::notify::NotificationDispatcher;
use crate::services::WORK_ORDER_STREAM;

/// Result of binding an inventory part into a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartBinding {
    pub line_item_id: LineItemId,
    /// Present when the request exceeded on-hand stock and the policy let it
    /// through (backorder).
    pub shortage: Option<StockShortage>,
}

pub struct WorkOrderService<S, B, L, N> {
    dispatcher: CommandDispatcher<S, B>,
    lookup: L,
    notifier: N,
    config: BillingConfig,
}

impl<S, B, L, N> WorkOrderService<S, B, L, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    L: InventoryLookup,
    N: NotificationDispatcher,
{
    pub fn new(store: S, bus: B, lookup: L, notifier: N, config: BillingConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            lookup,
            notifier,
            config,
        }
    }

    fn dispatch(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        command: WorkOrderCommand,
    ) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(
            tenant_id,
            work_order_id.0,
            WORK_ORDER_STREAM,
            command,
            |_, id| WorkOrder::empty(WorkOrderId::new(id)),
        )?;
        Ok(())
    }

    /// Rehydrate the current state of a work order.
    pub fn load(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<WorkOrder, DispatchError> {
        let order = self.dispatcher.load(tenant_id, work_order_id.0, |_, id| {
            WorkOrder::empty(WorkOrderId::new(id))
        })?;
        if order.tenant_id().is_none() {
            return Err(DomainError::NotFound.into());
        }
        Ok(order)
    }

    /// Open a new work order in `Pending` with the configured tax rate.
    pub fn open(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        customer_id: Option<AggregateId>,
        vehicle_id: Option<AggregateId>,
    ) -> Result<(), DispatchError> {
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::OpenWorkOrder(OpenWorkOrder {
                tenant_id,
                work_order_id,
                customer_id,
                vehicle_id,
                tax_rate: Some(self.config.default_tax_rate),
                priority: None,
                occurred_at: chrono::Utc::now(),
            }),
        )?;
        info!(%work_order_id, "opened work order");
        Ok(())
    }

    /// Append a free-form line item (labor, fee, or a part entered by hand).
    pub fn add_line_item(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        kind: LineItemKind,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<LineItemId, DispatchError> {
        let line_item_id = LineItemId::new();
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::AddLineItem(AddLineItem {
                tenant_id,
                work_order_id,
                line_item_id,
                kind,
                description: description.into(),
                quantity,
                unit_price,
                source_part_id: None,
                occurred_at: chrono::Utc::now(),
            }),
        )?;
        Ok(line_item_id)
    }

    /// Resolve a part through the inventory collaborator and bind it into
    /// the ledger at its current sell price.
    ///
    /// A stock shortage is a warning under the default policy (the shop may
    /// backorder); `StockPolicy::Block` turns it into `InsufficientStock`.
    pub async fn add_part_from_inventory(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        part_id: PartId,
        quantity: Decimal,
    ) -> Result<PartBinding, DispatchError> {
        let part = self.lookup.find_part(tenant_id, part_id).await?;

        let shortage = part.shortage_for(quantity);
        if let Some(s) = &shortage {
            match self.config.stock_policy {
                StockPolicy::Block => {
                    return Err(DomainError::InsufficientStock {
                        part_id: Uuid::from(part_id.0),
                        requested: s.requested,
                        on_hand: s.on_hand,
                    }
                    .into());
                }
                StockPolicy::Warn => {
                    warn!(
                        %work_order_id,
                        %part_id,
                        requested = %s.requested,
                        on_hand = %s.on_hand,
                        "part short on stock; binding anyway (backorder)"
                    );
                }
            }
        }

        let line_item_id = LineItemId::new();
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::AddLineItem(AddLineItem {
                tenant_id,
                work_order_id,
                line_item_id,
                kind: LineItemKind::Part,
                description: part.name.clone(),
                quantity,
                unit_price: part.sell_price,
                source_part_id: Some(part_id),
                occurred_at: chrono::Utc::now(),
            }),
        )?;

        info!(%work_order_id, %part_id, price = %part.sell_price, "bound part from inventory");
        Ok(PartBinding {
            line_item_id,
            shortage,
        })
    }

    /// Apply one tagged edit to an existing line item.
    pub fn update_line_item(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        line_item_id: LineItemId,
        change: LineItemChange,
    ) -> Result<(), DispatchError> {
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::UpdateLineItem(UpdateLineItem {
                tenant_id,
                work_order_id,
                line_item_id,
                change,
                occurred_at: chrono::Utc::now(),
            }),
        )
    }

    pub fn remove_line_item(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        line_item_id: LineItemId,
    ) -> Result<(), DispatchError> {
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::RemoveLineItem(RemoveLineItem {
                tenant_id,
                work_order_id,
                line_item_id,
                occurred_at: chrono::Utc::now(),
            }),
        )
    }

    /// Move the work order forward in the pipeline and notify the customer.
    ///
    /// The notification is best-effort: a dispatcher failure is logged and
    /// never rolls back or fails the transition.
    pub async fn change_status(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        new_status: WorkOrderStatus,
    ) -> Result<(), DispatchError> {
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::ChangeStatus(ChangeStatus {
                tenant_id,
                work_order_id,
                new_status,
                occurred_at: chrono::Utc::now(),
            }),
        )?;
        self.notify_status(tenant_id, work_order_id, new_status).await;
        Ok(())
    }

    /// Authorized jump to any non-terminal status, recording the actor.
    pub async fn override_status(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        new_status: WorkOrderStatus,
        authorized_by: UserId,
    ) -> Result<(), DispatchError> {
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::OverrideStatus(OverrideStatus {
                tenant_id,
                work_order_id,
                new_status,
                authorized_by,
                occurred_at: chrono::Utc::now(),
            }),
        )?;
        self.notify_status(tenant_id, work_order_id, new_status).await;
        Ok(())
    }

    pub fn set_priority(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        priority: WorkOrderPriority,
    ) -> Result<(), DispatchError> {
        self.dispatch(
            tenant_id,
            work_order_id,
            WorkOrderCommand::SetPriority(SetPriority {
                tenant_id,
                work_order_id,
                priority,
                occurred_at: chrono::Utc::now(),
            }),
        )
    }

    async fn notify_status(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        new_status: WorkOrderStatus,
    ) {
        if let Err(err) = self
            .notifier
            .send_status_update(tenant_id, work_order_id, new_status)
            .await
        {
            warn!(
                %work_order_id,
                status = %new_status,
                error = ?err,
                "status update notification failed"
            );
        }
    }
}
