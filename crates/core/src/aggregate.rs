//! Aggregate traits for the event-sourced domain model.

/// Aggregate root marker + minimal interface.
///
/// Deliberately small: domain crates decide how state evolves (handle/apply,
/// pure functions) without any infrastructure leaking in here.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far (the stream revision).
    ///
    /// This is what optimistic-concurrency checks compare against: a writer
    /// that decided on stale state has a stale `version()` and loses.
    fn version(&self) -> u64;
}

/// What a writer expects the stream revision to be at append time.
///
/// A mismatch is a stale write and must be rejected, never merged: the
/// losing writer reloads and decides again on current state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip the check (idempotent commands, migrations).
    Any,
    /// The stream must be exactly at this revision.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// Execution semantics of an event-sourced aggregate.
///
/// Decisions and state evolution are split: `handle` looks at current state
/// and a command and returns the events that should happen (or an error, and
/// then nothing happened); `apply` folds one event into state. Both are pure
/// and deterministic; IO belongs to the infrastructure around them.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold a single event into state, bumping `version()` by one.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events a command produces. Must not mutate state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
