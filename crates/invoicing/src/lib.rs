//! `wrenchflow-invoicing` — immutable billing snapshots.
//!
//! [`InvoiceComposer`] freezes a work order's ledger into an [`Invoice`];
//! re-generation produces a new snapshot that supersedes the prior one.

pub mod invoice;

pub use invoice::{Invoice, InvoiceComposer, InvoiceEvent, InvoiceGenerated, InvoiceId};
