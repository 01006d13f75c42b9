//! `wrenchflow-workorders` — the work order domain.
//!
//! One [`WorkOrder`] aggregate owns the line-item ledger and the status
//! workflow for a unit of requested vehicle service. Totals are maintained
//! eagerly; status moves forward-only unless an authorized override jumps it.

pub mod order;
pub mod status;

pub use order::{
    AddLineItem, ChangeStatus, LineItem, LineItemAdded, LineItemChange, LineItemId, LineItemKind,
    LineItemRemoved, LineItemUpdated, OpenWorkOrder, OverrideStatus, PriorityChanged,
    RemoveLineItem, SetPriority, StatusChanged, UpdateLineItem, WorkOrder, WorkOrderCommand,
    WorkOrderEvent, WorkOrderId, WorkOrderOpened,
};
pub use status::{WorkOrderPriority, WorkOrderStatus};
