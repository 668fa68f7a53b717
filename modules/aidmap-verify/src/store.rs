//! Persistence for verification logs and the cost ledger.
//!
//! One `verification_logs` row per pass, written exactly once when the pass
//! reaches its terminal event and immutable afterwards except for the
//! human-override columns. Cost ledger rows are one per LLM invocation.

use std::str::FromStr;

use aidmap_common::{Decision, FieldConflict, VerificationType};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cost::CostEntry;

/// A completed pass, ready to persist.
#[derive(Debug, Clone)]
pub struct NewVerificationLog {
    pub suggestion_id: Uuid,
    pub resource_id: Option<Uuid>,
    pub verification_type: VerificationType,
    pub agent_version: String,
    pub checks_summary: serde_json::Value,
    pub conflicts: Vec<FieldConflict>,
    pub score: f64,
    pub decision: Decision,
    pub decision_reason: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub api_call_count: u32,
    pub estimated_cost_usd: f64,
}

impl NewVerificationLog {
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

/// A persisted verification log row.
#[derive(Debug, Clone)]
pub struct VerificationLog {
    pub id: Uuid,
    pub suggestion_id: Uuid,
    pub resource_id: Option<Uuid>,
    pub verification_type: VerificationType,
    pub agent_version: String,
    pub checks_summary: serde_json::Value,
    pub conflicts: serde_json::Value,
    pub score: f64,
    pub decision: Decision,
    pub decision_reason: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub api_call_count: i32,
    pub estimated_cost_usd: f64,
    pub human_override_decision: Option<Decision>,
    pub human_override_note: Option<String>,
    pub human_override_at: Option<DateTime<Utc>>,
}

/// Where pass results are persisted. Production is [`PgVerificationStore`];
/// tests keep logs in memory.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn write_log(&self, log: &NewVerificationLog) -> Result<Uuid>;
    async fn record_costs(&self, suggestion_id: Uuid, entries: &[CostEntry]) -> Result<()>;
}

#[derive(Clone)]
pub struct PgVerificationStore {
    pool: PgPool,
}

impl PgVerificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the log and ledger tables if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verification_logs (
                id UUID PRIMARY KEY,
                suggestion_id UUID NOT NULL,
                resource_id UUID,
                verification_type TEXT NOT NULL,
                agent_version TEXT NOT NULL,
                checks_summary JSONB NOT NULL,
                conflicts JSONB NOT NULL,
                score DOUBLE PRECISION NOT NULL,
                decision TEXT NOT NULL,
                decision_reason TEXT NOT NULL,
                started_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ NOT NULL,
                duration_ms BIGINT NOT NULL,
                api_call_count INT NOT NULL,
                estimated_cost_usd DOUBLE PRECISION NOT NULL,
                human_override_decision TEXT,
                human_override_note TEXT,
                human_override_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS verification_logs_suggestion_idx \
             ON verification_logs (suggestion_id, completed_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_cost_ledger (
                id UUID PRIMARY KEY,
                suggestion_id UUID,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                operation TEXT NOT NULL,
                input_tokens INT NOT NULL,
                output_tokens INT NOT NULL,
                cost_usd DOUBLE PRECISION NOT NULL,
                context JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Latest persisted pass for a suggestion, if any.
    pub async fn latest_for_suggestion(
        &self,
        suggestion_id: Uuid,
    ) -> Result<Option<VerificationLog>> {
        let row = sqlx::query_as::<_, VerificationLog>(
            r#"
            SELECT id, suggestion_id, resource_id, verification_type, agent_version,
                   checks_summary, conflicts, score, decision, decision_reason,
                   started_at, completed_at, duration_ms, api_call_count,
                   estimated_cost_usd, human_override_decision, human_override_note,
                   human_override_at
            FROM verification_logs
            WHERE suggestion_id = $1
            ORDER BY completed_at DESC
            LIMIT 1
            "#,
        )
        .bind(suggestion_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Attach a later human override to a log. The original decision and
    /// reason stay untouched.
    pub async fn annotate_human_override(
        &self,
        log_id: Uuid,
        decision: Decision,
        note: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE verification_logs
            SET human_override_decision = $2,
                human_override_note = $3,
                human_override_at = now()
            WHERE id = $1
            "#,
        )
        .bind(log_id)
        .bind(decision.to_string())
        .bind(note)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LogStore for PgVerificationStore {
    async fn write_log(&self, log: &NewVerificationLog) -> Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO verification_logs
                (id, suggestion_id, resource_id, verification_type, agent_version,
                 checks_summary, conflicts, score, decision, decision_reason,
                 started_at, completed_at, duration_ms, api_call_count,
                 estimated_cost_usd)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(id)
        .bind(log.suggestion_id)
        .bind(log.resource_id)
        .bind(log.verification_type.to_string())
        .bind(&log.agent_version)
        .bind(&log.checks_summary)
        .bind(serde_json::to_value(&log.conflicts)?)
        .bind(log.score)
        .bind(log.decision.to_string())
        .bind(&log.decision_reason)
        .bind(log.started_at)
        .bind(log.completed_at)
        .bind(log.duration_ms())
        .bind(log.api_call_count as i32)
        .bind(log.estimated_cost_usd)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn record_costs(&self, suggestion_id: Uuid, entries: &[CostEntry]) -> Result<()> {
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO api_cost_ledger
                    (id, suggestion_id, provider, model, operation, input_tokens,
                     output_tokens, cost_usd, context, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(suggestion_id)
            .bind(&entry.provider)
            .bind(&entry.model)
            .bind(&entry.operation)
            .bind(entry.input_tokens as i32)
            .bind(entry.output_tokens as i32)
            .bind(entry.cost_usd)
            .bind(&entry.context)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for VerificationLog {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;

        let decision_text: String = row.try_get("decision")?;
        let decision = Decision::from_str(&decision_text)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        let vtype_text: String = row.try_get("verification_type")?;
        let verification_type = VerificationType::from_str(&vtype_text)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        let override_text: Option<String> = row.try_get("human_override_decision")?;
        let human_override_decision = override_text
            .map(|t| Decision::from_str(&t).map_err(|e| sqlx::Error::Decode(e.into())))
            .transpose()?;

        Ok(VerificationLog {
            id: row.try_get("id")?,
            suggestion_id: row.try_get("suggestion_id")?,
            resource_id: row.try_get("resource_id")?,
            verification_type,
            agent_version: row.try_get("agent_version")?,
            checks_summary: row.try_get("checks_summary")?,
            conflicts: row.try_get("conflicts")?,
            score: row.try_get("score")?,
            decision,
            decision_reason: row.try_get("decision_reason")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            duration_ms: row.try_get("duration_ms")?,
            api_call_count: row.try_get("api_call_count")?,
            estimated_cost_usd: row.try_get("estimated_cost_usd")?,
            human_override_decision,
            human_override_note: row.try_get("human_override_note")?,
            human_override_at: row.try_get("human_override_at")?,
        })
    }
}
