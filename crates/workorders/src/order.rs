use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wrenchflow_core::{
    line_total, Aggregate, AggregateId, AggregateRoot, DomainError, Entity, TaxRate, TenantId,
    UserId,
};
use wrenchflow_events::Event;
use wrenchflow_inventory::PartId;

use crate::status::{WorkOrderPriority, WorkOrderStatus};

/// Work order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(pub AggregateId);

impl WorkOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Line item identifier. Assigned at creation, stable for the item's life.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub Uuid);

impl LineItemId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LineItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<LineItemId> for Uuid {
    fn from(value: LineItemId) -> Self {
        value.0
    }
}

impl core::fmt::Display for LineItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What a line item bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemKind {
    Labor,
    Part,
    Fee,
}

impl LineItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LineItemKind::Labor => "labor",
            LineItemKind::Part => "part",
            LineItemKind::Fee => "fee",
        }
    }
}

/// One billable unit within a work order.
///
/// `line_total` is derived (`quantity * unit_price`, rounded to cents) and is
/// recomputed whenever quantity or unit price changes; it is never carried
/// independently of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub kind: LineItemKind,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// Non-owning back-reference to the inventory record this part line was
    /// bound from. Only present for `kind = Part`.
    pub source_part_id: Option<PartId>,
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A single-field edit to an existing line item.
///
/// Explicit variants instead of a stringly "field" key keep edits type-safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineItemChange {
    SetQuantity(Decimal),
    SetUnitPrice(Decimal),
    SetDescription(String),
    SetKind(LineItemKind),
}

/// Aggregate root: WorkOrder.
///
/// Owns the line-item ledger and the status workflow for one unit of
/// requested vehicle service. `subtotal` is maintained eagerly on every
/// applied mutation so reads are O(1) and always consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrder {
    id: WorkOrderId,
    tenant_id: Option<TenantId>,
    status: WorkOrderStatus,
    priority: WorkOrderPriority,
    customer_id: Option<AggregateId>,
    vehicle_id: Option<AggregateId>,
    line_items: Vec<LineItem>,
    subtotal: Decimal,
    tax_rate: TaxRate,
    actual_completion_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl WorkOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: WorkOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            status: WorkOrderStatus::Pending,
            priority: WorkOrderPriority::Normal,
            customer_id: None,
            vehicle_id: None,
            line_items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax_rate: TaxRate::default(),
            actual_completion_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> WorkOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> WorkOrderStatus {
        self.status
    }

    pub fn priority(&self) -> WorkOrderPriority {
        self.priority
    }

    pub fn customer_id(&self) -> Option<AggregateId> {
        self.customer_id
    }

    pub fn vehicle_id(&self) -> Option<AggregateId> {
        self.vehicle_id
    }

    /// Display-ordered line items (insertion order).
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn find_line_item(&self, id: LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|li| li.id == id)
    }

    /// Sum of line totals. Maintained eagerly; O(1) read.
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Subtotal grossed up by `tax_rate`, rounded to cents.
    pub fn total(&self, tax_rate: TaxRate) -> Decimal {
        tax_rate.gross(self.subtotal)
    }

    /// The rate captured at open time (shop default unless overridden).
    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn actual_completion_at(&self) -> Option<DateTime<Utc>> {
        self.actual_completion_at
    }

    /// Archived work orders reject every further command.
    pub fn is_archived(&self) -> bool {
        self.status.is_terminal()
    }
}

impl AggregateRoot for WorkOrder {
    type Id = WorkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWorkOrder {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub customer_id: Option<AggregateId>,
    pub vehicle_id: Option<AggregateId>,
    pub tax_rate: Option<TaxRate>,
    pub priority: Option<WorkOrderPriority>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItem {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub line_item_id: LineItemId,
    pub kind: LineItemKind,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub source_part_id: Option<PartId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLineItem {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub line_item_id: LineItemId,
    pub change: LineItemChange,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLineItem {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus (regular, forward-only move).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub new_status: WorkOrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: OverrideStatus (authorized jump to any non-terminal position).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideStatus {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub new_status: WorkOrderStatus,
    pub authorized_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPriority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPriority {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub priority: WorkOrderPriority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderCommand {
    OpenWorkOrder(OpenWorkOrder),
    AddLineItem(AddLineItem),
    UpdateLineItem(UpdateLineItem),
    RemoveLineItem(RemoveLineItem),
    ChangeStatus(ChangeStatus),
    OverrideStatus(OverrideStatus),
    SetPriority(SetPriority),
}

/// Event: WorkOrderOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderOpened {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub customer_id: Option<AggregateId>,
    pub vehicle_id: Option<AggregateId>,
    pub tax_rate: TaxRate,
    pub priority: WorkOrderPriority,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemAdded {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub line_item_id: LineItemId,
    pub kind: LineItemKind,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub source_part_id: Option<PartId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemUpdated {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub line_item_id: LineItemId,
    pub change: LineItemChange,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRemoved {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub from: WorkOrderStatus,
    pub new_status: WorkOrderStatus,
    /// Present when the move was an authorized override.
    pub authorized_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriorityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityChanged {
    pub tenant_id: TenantId,
    pub work_order_id: WorkOrderId,
    pub priority: WorkOrderPriority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderEvent {
    WorkOrderOpened(WorkOrderOpened),
    LineItemAdded(LineItemAdded),
    LineItemUpdated(LineItemUpdated),
    LineItemRemoved(LineItemRemoved),
    StatusChanged(StatusChanged),
    PriorityChanged(PriorityChanged),
}

impl Event for WorkOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WorkOrderEvent::WorkOrderOpened(_) => "workorders.order.opened",
            WorkOrderEvent::LineItemAdded(_) => "workorders.order.line_item_added",
            WorkOrderEvent::LineItemUpdated(_) => "workorders.order.line_item_updated",
            WorkOrderEvent::LineItemRemoved(_) => "workorders.order.line_item_removed",
            WorkOrderEvent::StatusChanged(_) => "workorders.order.status_changed",
            WorkOrderEvent::PriorityChanged(_) => "workorders.order.priority_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WorkOrderEvent::WorkOrderOpened(e) => e.occurred_at,
            WorkOrderEvent::LineItemAdded(e) => e.occurred_at,
            WorkOrderEvent::LineItemUpdated(e) => e.occurred_at,
            WorkOrderEvent::LineItemRemoved(e) => e.occurred_at,
            WorkOrderEvent::StatusChanged(e) => e.occurred_at,
            WorkOrderEvent::PriorityChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for WorkOrder {
    type Command = WorkOrderCommand;
    type Event = WorkOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WorkOrderEvent::WorkOrderOpened(e) => {
                self.id = e.work_order_id;
                self.tenant_id = Some(e.tenant_id);
                self.status = WorkOrderStatus::Pending;
                self.priority = e.priority;
                self.customer_id = e.customer_id;
                self.vehicle_id = e.vehicle_id;
                self.tax_rate = e.tax_rate;
                self.line_items.clear();
                self.subtotal = Decimal::ZERO;
                self.created = true;
            }
            WorkOrderEvent::LineItemAdded(e) => {
                self.line_items.push(LineItem {
                    id: e.line_item_id,
                    kind: e.kind,
                    description: e.description.clone(),
                    quantity: e.quantity,
                    unit_price: e.unit_price,
                    line_total: line_total(e.quantity, e.unit_price),
                    source_part_id: e.source_part_id,
                });
                self.recompute_subtotal();
            }
            WorkOrderEvent::LineItemUpdated(e) => {
                if let Some(item) = self.line_items.iter_mut().find(|li| li.id == e.line_item_id)
                {
                    match &e.change {
                        LineItemChange::SetQuantity(quantity) => {
                            item.quantity = *quantity;
                            item.line_total = line_total(item.quantity, item.unit_price);
                        }
                        LineItemChange::SetUnitPrice(unit_price) => {
                            item.unit_price = *unit_price;
                            item.line_total = line_total(item.quantity, item.unit_price);
                        }
                        LineItemChange::SetDescription(description) => {
                            item.description = description.clone();
                        }
                        LineItemChange::SetKind(kind) => {
                            item.kind = *kind;
                            if *kind != LineItemKind::Part {
                                item.source_part_id = None;
                            }
                        }
                    }
                }
                self.recompute_subtotal();
            }
            WorkOrderEvent::LineItemRemoved(e) => {
                self.line_items.retain(|li| li.id != e.line_item_id);
                self.recompute_subtotal();
            }
            WorkOrderEvent::StatusChanged(e) => {
                self.status = e.new_status;
                // Completion is stamped at most once, even if the order
                // revisits Completed via an override.
                if e.new_status == WorkOrderStatus::Completed
                    && self.actual_completion_at.is_none()
                {
                    self.actual_completion_at = Some(e.occurred_at);
                }
            }
            WorkOrderEvent::PriorityChanged(e) => {
                self.priority = e.priority;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WorkOrderCommand::OpenWorkOrder(cmd) => self.handle_open(cmd),
            WorkOrderCommand::AddLineItem(cmd) => self.handle_add_line_item(cmd),
            WorkOrderCommand::UpdateLineItem(cmd) => self.handle_update_line_item(cmd),
            WorkOrderCommand::RemoveLineItem(cmd) => self.handle_remove_line_item(cmd),
            WorkOrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            WorkOrderCommand::OverrideStatus(cmd) => self.handle_override_status(cmd),
            WorkOrderCommand::SetPriority(cmd) => self.handle_set_priority(cmd),
        }
    }
}

impl WorkOrder {
    fn recompute_subtotal(&mut self) {
        self.subtotal = self.line_items.iter().map(|li| li.line_total).sum();
    }

    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_work_order_id(&self, work_order_id: WorkOrderId) -> Result<(), DomainError> {
        if self.id != work_order_id {
            return Err(DomainError::invariant("work_order_id mismatch"));
        }
        Ok(())
    }

    /// Common precondition for every post-open command.
    fn ensure_mutable(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_work_order_id(work_order_id)?;
        if self.is_archived() {
            return Err(DomainError::WorkOrderArchived);
        }
        Ok(())
    }

    fn validate_amounts(quantity: Decimal, unit_price: Decimal) -> Result<(), DomainError> {
        if quantity < Decimal::ZERO {
            return Err(DomainError::invalid_amount("quantity cannot be negative"));
        }
        if unit_price < Decimal::ZERO {
            return Err(DomainError::invalid_amount("unit_price cannot be negative"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("work order already exists"));
        }

        Ok(vec![WorkOrderEvent::WorkOrderOpened(WorkOrderOpened {
            tenant_id: cmd.tenant_id,
            work_order_id: cmd.work_order_id,
            customer_id: cmd.customer_id,
            vehicle_id: cmd.vehicle_id,
            tax_rate: cmd.tax_rate.unwrap_or_default(),
            priority: cmd.priority.unwrap_or_default(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line_item(&self, cmd: &AddLineItem) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_mutable(cmd.tenant_id, cmd.work_order_id)?;
        Self::validate_amounts(cmd.quantity, cmd.unit_price)?;

        if cmd.source_part_id.is_some() && cmd.kind != LineItemKind::Part {
            return Err(DomainError::validation(
                "source_part_id is only valid for part line items",
            ));
        }
        if self.find_line_item(cmd.line_item_id).is_some() {
            return Err(DomainError::conflict("line item id already in use"));
        }

        Ok(vec![WorkOrderEvent::LineItemAdded(LineItemAdded {
            tenant_id: cmd.tenant_id,
            work_order_id: cmd.work_order_id,
            line_item_id: cmd.line_item_id,
            kind: cmd.kind,
            description: cmd.description.clone(),
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            source_part_id: cmd.source_part_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_line_item(
        &self,
        cmd: &UpdateLineItem,
    ) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_mutable(cmd.tenant_id, cmd.work_order_id)?;

        if self.find_line_item(cmd.line_item_id).is_none() {
            return Err(DomainError::LineItemNotFound(cmd.line_item_id.into()));
        }

        match &cmd.change {
            LineItemChange::SetQuantity(quantity) => {
                if *quantity < Decimal::ZERO {
                    return Err(DomainError::invalid_amount("quantity cannot be negative"));
                }
            }
            LineItemChange::SetUnitPrice(unit_price) => {
                if *unit_price < Decimal::ZERO {
                    return Err(DomainError::invalid_amount("unit_price cannot be negative"));
                }
            }
            LineItemChange::SetDescription(_) | LineItemChange::SetKind(_) => {}
        }

        Ok(vec![WorkOrderEvent::LineItemUpdated(LineItemUpdated {
            tenant_id: cmd.tenant_id,
            work_order_id: cmd.work_order_id,
            line_item_id: cmd.line_item_id,
            change: cmd.change.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line_item(
        &self,
        cmd: &RemoveLineItem,
    ) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_mutable(cmd.tenant_id, cmd.work_order_id)?;

        if self.find_line_item(cmd.line_item_id).is_none() {
            return Err(DomainError::LineItemNotFound(cmd.line_item_id.into()));
        }

        Ok(vec![WorkOrderEvent::LineItemRemoved(LineItemRemoved {
            tenant_id: cmd.tenant_id,
            work_order_id: cmd.work_order_id,
            line_item_id: cmd.line_item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeStatus,
    ) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_mutable(cmd.tenant_id, cmd.work_order_id)?;

        if !self.status.can_advance_to(cmd.new_status) {
            return Err(DomainError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: cmd.new_status.as_str().to_string(),
            });
        }

        Ok(vec![WorkOrderEvent::StatusChanged(StatusChanged {
            tenant_id: cmd.tenant_id,
            work_order_id: cmd.work_order_id,
            from: self.status,
            new_status: cmd.new_status,
            authorized_by: None,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_override_status(
        &self,
        cmd: &OverrideStatus,
    ) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_mutable(cmd.tenant_id, cmd.work_order_id)?;

        // An override may jump anywhere except standing still; the terminal
        // guard above still applies (archived orders stay archived).
        if cmd.new_status == self.status {
            return Err(DomainError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: cmd.new_status.as_str().to_string(),
            });
        }

        Ok(vec![WorkOrderEvent::StatusChanged(StatusChanged {
            tenant_id: cmd.tenant_id,
            work_order_id: cmd.work_order_id,
            from: self.status,
            new_status: cmd.new_status,
            authorized_by: Some(cmd.authorized_by),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_priority(&self, cmd: &SetPriority) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_mutable(cmd.tenant_id, cmd.work_order_id)?;

        if cmd.priority == self.priority {
            return Err(DomainError::validation("priority unchanged"));
        }

        Ok(vec![WorkOrderEvent::PriorityChanged(PriorityChanged {
            tenant_id: cmd.tenant_id,
            work_order_id: cmd.work_order_id,
            priority: cmd.priority,
            occurred_at: cmd.occurred_at,
        })])
    }
}
