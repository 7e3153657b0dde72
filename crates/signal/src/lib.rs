//! Typed keys and scoped sinks that detectors raise facts into and query
//! from. This is the "blackboard" the whole engine communicates through;
//! detectors never call each other directly.

mod entry;
mod key;
mod payload;
mod sink;

pub use entry::SignalEntry;
pub use key::{SignalKey, SignalPattern};
pub use payload::SignalPayload;
pub use sink::{SharedSink, SignalSink, SinkStats};
