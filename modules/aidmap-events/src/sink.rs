use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::types::EventKind;

/// Where the pipeline publishes its trace. Production is [`crate::PgEventStore`];
/// tests use [`MemorySink`].
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, suggestion_id: Uuid, kind: EventKind) -> Result<()>;
}

#[cfg(feature = "test-utils")]
pub use memory::MemorySink;

#[cfg(feature = "test-utils")]
mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-memory sink for orchestrator tests. Preserves emission order.
    #[derive(Default)]
    pub struct MemorySink {
        events: Mutex<Vec<(Uuid, EventKind)>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn all(&self) -> Vec<(Uuid, EventKind)> {
            self.events.lock().unwrap().clone()
        }

        pub fn for_suggestion(&self, suggestion_id: Uuid) -> Vec<EventKind> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| *id == suggestion_id)
                .map(|(_, kind)| kind.clone())
                .collect()
        }

        /// Count of terminal (completed/failed) events for one suggestion.
        pub fn terminal_count(&self, suggestion_id: Uuid) -> usize {
            self.for_suggestion(suggestion_id)
                .iter()
                .filter(|k| k.is_terminal())
                .count()
        }
    }

    #[async_trait]
    impl EventSink for MemorySink {
        async fn emit(&self, suggestion_id: Uuid, kind: EventKind) -> Result<()> {
            self.events.lock().unwrap().push((suggestion_id, kind));
            Ok(())
        }
    }
}
