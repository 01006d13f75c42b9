//! `wrenchflow-events` — event abstractions shared by the domain crates.
//!
//! Domain crates define their typed events and implement [`Event`]; the
//! infrastructure wraps them in tenant-scoped [`EventEnvelope`]s and moves
//! them through an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use tenant::TenantScoped;
