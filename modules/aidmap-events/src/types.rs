use aidmap_common::{Decision, VerificationType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a suggestion's verification trace.
///
/// The tag doubles as the `event_type` column so consumers can filter in SQL
/// without unpacking the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    Started {
        verification_type: VerificationType,
        agent_version: String,
    },
    Progress {
        stage: String,
        detail: String,
    },
    Cost {
        provider: String,
        model: String,
        operation: String,
        input_tokens: u32,
        output_tokens: u32,
        cost_usd: f64,
    },
    Completed {
        score: f64,
        decision: Decision,
        decision_reason: String,
        duration_ms: u64,
    },
    Failed {
        error: String,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Started { .. } => "started",
            EventKind::Progress { .. } => "progress",
            EventKind::Cost { .. } => "cost",
            EventKind::Completed { .. } => "completed",
            EventKind::Failed { .. } => "failed",
        }
    }

    /// Terminal events close a suggestion's trace; exactly one is emitted
    /// per pass.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Completed { .. } | EventKind::Failed { .. })
    }
}

/// An event as stored in Postgres. Returned by all read methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub seq: i64,
    pub suggestion_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Decode the payload back into a typed kind.
    pub fn kind(&self) -> Option<EventKind> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}
