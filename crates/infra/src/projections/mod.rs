//! Read-model projections over published event envelopes.

pub mod parts_catalog;
pub mod work_order_board;

pub use parts_catalog::{PartsCatalogError, PartsCatalogProjection};
pub use work_order_board::{WorkOrderBoardError, WorkOrderBoardProjection, WorkOrderSummary};
