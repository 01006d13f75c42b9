//! `wrenchflow-infra` — infrastructure layer.
//!
//! Event storage, command dispatch, read-model projections, and the
//! collaborator boundaries (inventory lookup, invoice archive, notification
//! dispatch), with in-memory implementations for tests/dev. Durable backends
//! plug in behind the same traits.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod invoice_archive;
pub mod notify;
pub mod projections;
pub mod read_model;
pub mod services;
pub mod workers;

mod integration_tests;
