//! PgEventStore — append-only verification trace backed by Postgres.
//!
//! Gap-free reads are guaranteed internally. Consumers never see BIGSERIAL
//! gaps from rolled-back or in-flight transactions.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::sink::EventSink;
use crate::types::{EventKind, StoredEvent};

/// Append-only trace store. The single source of truth for pass progress.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the events table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verification_events (
                seq BIGSERIAL PRIMARY KEY,
                suggestion_id UUID NOT NULL,
                event_type TEXT NOT NULL,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS verification_events_suggestion_idx \
             ON verification_events (suggestion_id, seq)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append one event. Returns the assigned sequence number.
    pub async fn append(&self, suggestion_id: Uuid, kind: &EventKind) -> Result<i64> {
        let payload = serde_json::to_value(kind)?;

        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO verification_events (suggestion_id, event_type, payload)
            VALUES ($1, $2, $3)
            RETURNING seq
            "#,
        )
        .bind(suggestion_id)
        .bind(kind.name())
        .bind(&payload)
        .fetch_one(&self.pool)
        .await?;

        let seq = row.0;

        // Best-effort PG NOTIFY — a nudge for subscribers, not a delivery
        // guarantee. A missed notification is recovered by reading from the
        // last known seq.
        notify_new_event(&self.pool, seq).await;

        Ok(seq)
    }

    /// Full ordered trace for one suggestion.
    pub async fn read_for_suggestion(&self, suggestion_id: Uuid) -> Result<Vec<StoredEvent>> {
        let rows = sqlx::query_as::<_, StoredEvent>(
            r#"
            SELECT seq, suggestion_id, event_type, payload, created_at
            FROM verification_events
            WHERE suggestion_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(suggestion_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Read events in flat sequence order starting from `seq_start` (inclusive).
    ///
    /// **Gap-free guarantee:** if concurrent transactions created a momentary
    /// gap, this returns events only up to the gap boundary. The next call
    /// picks up where it left off once the gap closes.
    pub async fn read_from(&self, seq_start: i64, limit: usize) -> Result<Vec<StoredEvent>> {
        let rows = sqlx::query_as::<_, StoredEvent>(
            r#"
            SELECT seq, suggestion_id, event_type, payload, created_at
            FROM verification_events
            WHERE seq >= $1
            ORDER BY seq ASC
            LIMIT $2
            "#,
        )
        .bind(seq_start)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        let mut expected_seq = seq_start;

        for row in rows {
            if row.seq != expected_seq {
                // Gap detected — an in-flight transaction hasn't committed
                // yet. Return what we have; the next call reads the rest.
                break;
            }
            expected_seq = row.seq + 1;
            result.push(row);
        }

        Ok(result)
    }

    /// The latest committed sequence number, or 0 if the table is empty.
    pub async fn latest_seq(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (Option<i64>,)>("SELECT MAX(seq) FROM verification_events")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0.unwrap_or(0))
    }
}

#[async_trait]
impl EventSink for PgEventStore {
    async fn emit(&self, suggestion_id: Uuid, kind: EventKind) -> Result<()> {
        self.append(suggestion_id, &kind).await?;
        Ok(())
    }
}

async fn notify_new_event(pool: &PgPool, seq: i64) {
    let result = sqlx::query("SELECT pg_notify('verification_events', $1::text)")
        .bind(seq)
        .execute(pool)
        .await;

    if let Err(e) = result {
        warn!(error = %e, seq, "PG NOTIFY failed (non-fatal)");
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredEvent {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(StoredEvent {
            seq: row.try_get("seq")?,
            suggestion_id: row.try_get("suggestion_id")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
