use chrono::{DateTime, Utc};

/// Behavior shared by every domain event.
///
/// An event is a fact: something that already happened to an aggregate and
/// was accepted into its stream. Implementations are plain data (serde
/// structs); this trait only exposes the metadata the store and the
/// envelopes need to file them.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted name identifying the event kind
    /// (e.g. `"workorders.order.line_item_added"`). Persisted alongside the
    /// payload and used to route envelopes without opening them.
    fn event_type(&self) -> &'static str;

    /// Business time: when the recorded thing actually happened.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Payload schema version, for event evolution. Override once a second
    /// shape of the payload exists; readers pick the decoder by version.
    fn version(&self) -> u32 {
        1
    }
}
