//! Pipeline orchestration: one suggestion at a time through format checks,
//! network checks, AI checks, scoring, and the decision, with the event
//! trace and cost ledger maintained throughout.

use std::sync::Arc;

use aidmap_common::{FieldConflict, Suggestion, VerificationType};
use aidmap_events::{EventKind, EventSink};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analyst::Analyst;
use crate::autofix::attempt_url_fix;
use crate::checks::content::{extract_page_text, PageFetcher};
use crate::checks::cross_reference::{cross_reference, DirectoryIndex};
use crate::checks::geocode::{check_geocode, Geocoder};
use crate::checks::phone::validate_phone;
use crate::checks::reachability::{check_reachability, UrlProber};
use crate::checks::{CheckKind, CheckOutcome, VerificationChecks};
use crate::conflicts::{detect_conflicts, DEFAULT_SIMILARITY_THRESHOLD};
use crate::cost::{CostEntry, CostTracker};
use crate::decision::{decide, DecisionThresholds, HardFail};
use crate::intake::{BatchOutcome, ResourceOutcome, SubmissionStatus};
use crate::scoring::score;
use crate::store::{LogStore, NewVerificationLog};

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Tag written into every log row, so reruns after prompt or weight
    /// changes are distinguishable.
    pub agent_version: String,
    pub thresholds: DecisionThresholds,
    pub similarity_threshold: f64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            agent_version: "aidmap-verify/0.1".to_string(),
            thresholds: DecisionThresholds::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Everything the pipeline talks to, injected so tests run on doubles and
/// credentials stay per-tenant.
pub struct VerifierDeps {
    pub prober: Arc<dyn UrlProber>,
    pub geocoder: Arc<dyn Geocoder>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub analyst: Arc<dyn Analyst>,
    pub indices: Vec<Arc<dyn DirectoryIndex>>,
    pub sink: Arc<dyn EventSink>,
    pub store: Arc<dyn LogStore>,
}

/// Accumulated state of one pass. Survives a mid-pass fault so the boundary
/// can still log what ran.
#[derive(Default)]
struct PassState {
    checks: VerificationChecks,
    conflicts: Vec<FieldConflict>,
    hard_fails: Vec<HardFail>,
}

pub struct Verifier {
    deps: VerifierDeps,
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(deps: VerifierDeps, config: VerifierConfig) -> Self {
        Self { deps, config }
    }

    /// Verify a batch sequentially. One suggestion's failure never stops the
    /// batch; every suggestion gets exactly one outcome.
    pub async fn verify_batch(
        &self,
        suggestions: &[Suggestion],
        verification_type: VerificationType,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for suggestion in suggestions {
            outcome.push(self.verify_one(suggestion, verification_type).await);
        }

        outcome
    }

    /// Verify one suggestion. This is the submission boundary: any fault in
    /// the pass is converted to a flag-for-human log with the error as the
    /// reason, and the event trail is always closed with a terminal event.
    pub async fn verify_one(
        &self,
        suggestion: &Suggestion,
        verification_type: VerificationType,
    ) -> ResourceOutcome {
        let started_at = Utc::now();
        let cost = CostTracker::new();
        let mut state = PassState::default();

        let result = self
            .run_pass(suggestion, verification_type, &cost, &mut state)
            .await;

        match result {
            Ok(()) => {
                let score = score(&state.checks);
                let (decision, reason) =
                    decide(score, &state.hard_fails, &self.config.thresholds);

                let log = NewVerificationLog {
                    suggestion_id: suggestion.id,
                    resource_id: None,
                    verification_type,
                    agent_version: self.config.agent_version.clone(),
                    checks_summary: state.checks.summary(),
                    conflicts: state.conflicts.clone(),
                    score,
                    decision,
                    decision_reason: reason.clone(),
                    started_at,
                    completed_at: Utc::now(),
                    api_call_count: cost.api_call_count(),
                    estimated_cost_usd: cost.total_cost_usd(),
                };

                self.persist(suggestion.id, &log, &cost).await;

                self.emit_terminal(
                    suggestion.id,
                    EventKind::Completed {
                        score,
                        decision,
                        decision_reason: reason.clone(),
                        duration_ms: log.duration_ms().max(0) as u64,
                    },
                )
                .await;

                info!(
                    suggestion_id = %suggestion.id,
                    org = %suggestion.name,
                    score,
                    decision = %decision,
                    cost_usd = log.estimated_cost_usd,
                    "Verification complete"
                );

                ResourceOutcome {
                    suggestion_id: suggestion.id,
                    status: decision.into(),
                    reason: Some(reason),
                    score: Some(score),
                }
            }
            Err(e) => {
                let reason = format!("verification error: {e:#}");
                warn!(suggestion_id = %suggestion.id, error = %reason, "Pass faulted, flagging for human");

                let partial_score = score(&state.checks);
                let log = NewVerificationLog {
                    suggestion_id: suggestion.id,
                    resource_id: None,
                    verification_type,
                    agent_version: self.config.agent_version.clone(),
                    checks_summary: state.checks.summary(),
                    conflicts: state.conflicts.clone(),
                    score: partial_score,
                    decision: aidmap_common::Decision::FlagForHuman,
                    decision_reason: reason.clone(),
                    started_at,
                    completed_at: Utc::now(),
                    api_call_count: cost.api_call_count(),
                    estimated_cost_usd: cost.total_cost_usd(),
                };

                self.persist(suggestion.id, &log, &cost).await;

                self.emit_terminal(
                    suggestion.id,
                    EventKind::Failed {
                        error: reason.clone(),
                    },
                )
                .await;

                ResourceOutcome {
                    suggestion_id: suggestion.id,
                    status: SubmissionStatus::Error,
                    reason: Some(reason),
                    score: None,
                }
            }
        }
    }

    async fn run_pass(
        &self,
        suggestion: &Suggestion,
        verification_type: VerificationType,
        cost: &CostTracker,
        state: &mut PassState,
    ) -> Result<()> {
        self.deps
            .sink
            .emit(
                suggestion.id,
                EventKind::Started {
                    verification_type,
                    agent_version: self.config.agent_version.clone(),
                },
            )
            .await
            .context("failed to open event trail")?;

        self.check_phone(suggestion, state).await?;
        let live_url = self.check_website(suggestion, cost, state).await?;
        self.check_address(suggestion, cost, state).await?;
        self.check_content(suggestion, live_url.as_deref(), cost, state)
            .await?;
        self.check_indices(suggestion, cost, state).await?;

        // Conflict detection only means something once an external source
        // produced comparable fields.
        if state.checks.get(CheckKind::WebsiteContentMatches).is_some()
            || state.checks.get(CheckKind::CrossReferenced).is_some()
        {
            let pass = state.conflicts.is_empty();
            state.checks.record(
                CheckKind::ConflictDetection,
                CheckOutcome::new(pass, None, &state.conflicts),
            );
            self.progress(
                suggestion.id,
                "conflicts",
                format!("{} field conflict(s)", state.conflicts.len()),
            )
            .await?;
        }

        Ok(())
    }

    async fn check_phone(&self, suggestion: &Suggestion, state: &mut PassState) -> Result<()> {
        let Some(phone) = &suggestion.phone else {
            return Ok(());
        };

        let check = validate_phone(phone);
        if !check.pass {
            state.hard_fails.push(HardFail::InvalidPhone);
        }

        let detail = match &check.formatted {
            Some(formatted) => format!("valid: {formatted}"),
            None => "invalid format".to_string(),
        };

        state
            .checks
            .record(CheckKind::PhoneValid, CheckOutcome::new(check.pass, None, &check));
        self.progress(suggestion.id, "phone", detail).await
    }

    /// Reachability plus the auto-fixer. Returns the URL worth fetching
    /// content from, when one is live.
    async fn check_website(
        &self,
        suggestion: &Suggestion,
        cost: &CostTracker,
        state: &mut PassState,
    ) -> Result<Option<String>> {
        let Some(website) = &suggestion.website else {
            return Ok(None);
        };

        cost.count_api_call();
        let check = check_reachability(self.deps.prober.as_ref(), website).await;

        if check.pass {
            let detail = format!(
                "reachable ({}) in {}ms",
                check.status_code.unwrap_or(0),
                check.latency_ms
            );
            state
                .checks
                .record(CheckKind::UrlReachable, CheckOutcome::new(true, None, &check));
            self.progress(suggestion.id, "reachability", detail).await?;
            return Ok(Some(website.clone()));
        }

        self.progress(
            suggestion.id,
            "reachability",
            "website unreachable, attempting repair",
        )
        .await?;

        if self.deps.analyst.can_search() {
            let fix = attempt_url_fix(
                self.deps.analyst.as_ref(),
                self.deps.prober.as_ref(),
                cost,
                suggestion,
                website,
            )
            .await;

            if let Some(entry) = &fix.cost {
                self.emit_cost(suggestion.id, entry).await?;
            }

            if fix.fixed {
                if let (Some(new_url), Some(mut recheck)) = (fix.new_url, fix.reachability) {
                    recheck.fixed_url = Some(new_url.clone());
                    state
                        .checks
                        .record(CheckKind::UrlReachable, CheckOutcome::new(true, None, &recheck));
                    self.progress(
                        suggestion.id,
                        "reachability",
                        format!("repaired to {new_url}"),
                    )
                    .await?;
                    return Ok(Some(new_url));
                }
            }
        }

        state.hard_fails.push(HardFail::DeadWebsite);
        state
            .checks
            .record(CheckKind::UrlReachable, CheckOutcome::new(false, None, &check));
        Ok(None)
    }

    async fn check_address(
        &self,
        suggestion: &Suggestion,
        cost: &CostTracker,
        state: &mut PassState,
    ) -> Result<()> {
        let Some(query) = suggestion.full_address() else {
            return Ok(());
        };

        cost.count_api_call();
        let Some(check) = check_geocode(self.deps.geocoder.as_ref(), &query).await else {
            // Provider down: the check is unavailable, not failed.
            return Ok(());
        };

        let detail = if check.pass {
            format!(
                "resolved to ({:.4}, {:.4})",
                check.lat.unwrap_or(0.0),
                check.lng.unwrap_or(0.0)
            )
        } else {
            "address not found".to_string()
        };

        state.checks.record(
            CheckKind::AddressGeocodable,
            CheckOutcome::new(check.pass, check.confidence, &check),
        );
        self.progress(suggestion.id, "geocode", detail).await
    }

    async fn check_content(
        &self,
        suggestion: &Suggestion,
        live_url: Option<&str>,
        cost: &CostTracker,
        state: &mut PassState,
    ) -> Result<()> {
        let Some(url) = live_url else {
            return Ok(());
        };

        cost.count_api_call();
        let Some(text) = extract_page_text(self.deps.fetcher.as_ref(), url).await else {
            return Ok(());
        };

        match self.deps.analyst.judge_content_match(suggestion, &text).await {
            Ok(reply) => {
                let entry = cost.record_llm(
                    self.deps.analyst.provider(),
                    self.deps.analyst.model(),
                    "content_match",
                    reply.usage,
                    serde_json::json!({
                        "organization": suggestion.name,
                        "url": url,
                    }),
                );
                self.emit_cost(suggestion.id, &entry).await?;

                let verdict = reply.value;
                let confidence = verdict.confidence.clamp(0.0, 1.0);

                if verdict.matches {
                    state.conflicts.extend(detect_conflicts(
                        suggestion,
                        &verdict.found,
                        "website",
                        self.config.similarity_threshold,
                    ));
                }

                let detail = if verdict.matches {
                    format!("content matches (confidence {confidence:.2})")
                } else {
                    "content does not match".to_string()
                };

                state.checks.record(
                    CheckKind::WebsiteContentMatches,
                    CheckOutcome::new(verdict.matches, Some(confidence), &verdict),
                );
                self.progress(suggestion.id, "content", detail).await?;
            }
            Err(e) => {
                // Provider error: check unavailable, excluded from scoring.
                warn!(url, error = %e, "Content analyst unavailable");
            }
        }

        Ok(())
    }

    async fn check_indices(
        &self,
        suggestion: &Suggestion,
        cost: &CostTracker,
        state: &mut PassState,
    ) -> Result<()> {
        if self.deps.indices.is_empty() {
            return Ok(());
        }

        for _ in &self.deps.indices {
            cost.count_api_call();
        }

        let address = suggestion.full_address();
        let Some(xref) =
            cross_reference(&self.deps.indices, &suggestion.name, address.as_deref()).await
        else {
            return Ok(());
        };

        for result in &xref.results {
            if let Some(data) = &result.data {
                state.conflicts.extend(detect_conflicts(
                    suggestion,
                    data,
                    &result.source,
                    self.config.similarity_threshold,
                ));
            }
        }

        let detail = match xref.confidence {
            Some(best) => format!("best match score {best:.2}"),
            None => "no match in any source".to_string(),
        };

        state.checks.record(
            CheckKind::CrossReferenced,
            CheckOutcome::new(xref.pass, xref.confidence, &xref.results),
        );
        self.progress(suggestion.id, "cross_reference", detail).await
    }

    // --- event/persistence plumbing ---

    async fn progress(
        &self,
        suggestion_id: Uuid,
        stage: &str,
        detail: impl Into<String>,
    ) -> Result<()> {
        self.deps
            .sink
            .emit(
                suggestion_id,
                EventKind::Progress {
                    stage: stage.to_string(),
                    detail: detail.into(),
                },
            )
            .await
            .with_context(|| format!("failed to emit {stage} progress event"))
    }

    async fn emit_cost(&self, suggestion_id: Uuid, entry: &CostEntry) -> Result<()> {
        self.deps
            .sink
            .emit(
                suggestion_id,
                EventKind::Cost {
                    provider: entry.provider.clone(),
                    model: entry.model.clone(),
                    operation: entry.operation.clone(),
                    input_tokens: entry.input_tokens,
                    output_tokens: entry.output_tokens,
                    cost_usd: entry.cost_usd,
                },
            )
            .await
            .context("failed to emit cost event")
    }

    /// Terminal events and log writes are best-effort at the boundary: a
    /// storage failure here is logged loudly but never resurrects the pass.
    async fn emit_terminal(&self, suggestion_id: Uuid, kind: EventKind) {
        if let Err(e) = self.deps.sink.emit(suggestion_id, kind).await {
            error!(suggestion_id = %suggestion_id, error = %e, "Failed to emit terminal event");
        }
    }

    async fn persist(&self, suggestion_id: Uuid, log: &NewVerificationLog, cost: &CostTracker) {
        if let Err(e) = self.deps.store.write_log(log).await {
            error!(suggestion_id = %suggestion_id, error = %e, "Failed to write verification log");
        }

        let entries = cost.entries();
        if !entries.is_empty() {
            if let Err(e) = self.deps.store.record_costs(suggestion_id, &entries).await {
                error!(suggestion_id = %suggestion_id, error = %e, "Failed to write cost ledger");
            }
        }
    }
}
