//! Append-only verification event trail.
//!
//! Every verification pass writes an ordered trace of typed events keyed by
//! suggestion id. Rows are never updated or deleted; per-suggestion ordering
//! is monotonic by `seq` and reads are gap-fenced so CDC-style consumers
//! never observe holes from in-flight transactions.

pub mod sink;
pub mod store;
pub mod types;

pub use sink::EventSink;
pub use store::PgEventStore;
pub use types::{EventKind, StoredEvent};

#[cfg(feature = "test-utils")]
pub use sink::MemorySink;
