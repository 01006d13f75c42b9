//! `wrenchflow-inventory` — parts catalog domain.
//!
//! The [`Part`] aggregate tracks one catalog record (sell price, on-hand
//! quantity); [`InventoryLookup`] is the read-side boundary the work-order
//! ledger uses to bind parts into line items.

pub mod lookup;
pub mod part;

pub use lookup::{InventoryLookup, PartSummary, StockShortage};
pub use part::{
    AdjustStock, CreatePart, Part, PartCommand, PartCreated, PartEvent, PartId, SellPriceChanged,
    SetSellPrice, StockAdjusted,
};
