//! Application services orchestrating aggregates and collaborators.

pub mod invoicing;
pub mod work_orders;

/// Stream type identifiers (one per aggregate family).
pub const WORK_ORDER_STREAM: &str = "workorders.order";
pub const PART_STREAM: &str = "inventory.part";
pub const INVOICE_STREAM: &str = "invoicing.invoice";

pub use invoicing::{completed_work_order, InvoicingError, InvoicingService};
pub use work_orders::{PartBinding, WorkOrderService};
