//! Background consumers of the event bus.

mod event_worker;

pub use event_worker::{EventWorker, WorkerHandle};
