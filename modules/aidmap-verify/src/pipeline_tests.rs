//! Orchestrator tests — MOCK → FUNCTION → OUTPUT.
//!
//! Wire mocks into the verifier, run a pass, assert on the decision, the
//! event trace, and what got persisted.

use std::sync::Arc;

use aidmap_common::{Decision, VerificationType};
use aidmap_events::{EventKind, EventSink, MemorySink};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::checks::cross_reference::{DirectoryIndex, FoundOrganization};
use crate::intake::SubmissionStatus;
use crate::pipeline::{Verifier, VerifierConfig, VerifierDeps};
use crate::testing::*;

struct TestBed {
    prober: Arc<MockProber>,
    geocoder: Arc<MockGeocoder>,
    fetcher: Arc<MockFetcher>,
    analyst: Arc<MockAnalyst>,
    indices: Vec<Arc<dyn DirectoryIndex>>,
    sink: Arc<MemorySink>,
    store: Arc<MemoryLogStore>,
}

impl TestBed {
    fn new() -> Self {
        Self {
            prober: Arc::new(MockProber::new().with_pass_url("https://oakparkintake.org")),
            geocoder: Arc::new(MockGeocoder::hit()),
            fetcher: Arc::new(MockFetcher::new()),
            analyst: Arc::new(MockAnalyst::new()),
            indices: Vec::new(),
            sink: Arc::new(MemorySink::new()),
            store: Arc::new(MemoryLogStore::new()),
        }
    }

    fn verifier(&self) -> Verifier {
        Verifier::new(
            VerifierDeps {
                prober: self.prober.clone(),
                geocoder: self.geocoder.clone(),
                fetcher: self.fetcher.clone(),
                analyst: self.analyst.clone(),
                indices: self.indices.clone(),
                sink: self.sink.clone(),
                store: self.store.clone(),
            },
            VerifierConfig::default(),
        )
    }
}

/// Index data mirroring the fixture exactly — zero conflicts expected.
fn matching_org() -> FoundOrganization {
    FoundOrganization {
        name: Some("Oak Park Intake Center".to_string()),
        phone: Some("5551234567".to_string()),
        website: Some("https://oakparkintake.org".to_string()),
        address: Some("1212 Broadway".to_string()),
        email: Some("info@oakparkintake.org".to_string()),
    }
}

const ORG_PAGE: &str = r#"<html><body>
  <h1>Oak Park Intake Center</h1>
  <p>Call us at (555) 123-4567 or visit 1212 Broadway, Oakland.</p>
</body></html>"#;

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn strong_submission_is_auto_approved() {
    let mut bed = TestBed::new();
    bed.fetcher = Arc::new(MockFetcher::new().with_page("https://oakparkintake.org", ORG_PAGE));
    bed.analyst = Arc::new(MockAnalyst::new().with_content_match(true, 0.9));
    bed.indices = vec![Arc::new(MockIndex::matching(
        "community_index",
        0.95,
        matching_org(),
    ))];

    let suggestion = suggestion_fixture();
    let outcome = bed
        .verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    assert_eq!(outcome.status, SubmissionStatus::AutoApproved);
    assert!(outcome.score.unwrap() >= 0.85, "score {:?}", outcome.score);

    // One log row, matching the outcome.
    let logs = bed.store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].decision, Decision::AutoApprove);
    assert!(logs[0].conflicts.is_empty());
    assert!(logs[0].checks_summary.get("conflict_detection").is_some());

    // Content-match spend is in the ledger.
    let rows = bed.store.cost_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1[0].operation, "content_match");
}

#[tokio::test]
async fn trace_opens_with_started_and_closes_with_one_terminal() {
    let mut bed = TestBed::new();
    bed.analyst = Arc::new(MockAnalyst::new().with_content_match(true, 0.9));
    bed.fetcher = Arc::new(MockFetcher::new().with_page("https://oakparkintake.org", ORG_PAGE));

    let suggestion = suggestion_fixture();
    bed.verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    let events = bed.sink.for_suggestion(suggestion.id);
    assert!(matches!(events.first(), Some(EventKind::Started { .. })));
    assert!(events.last().unwrap().is_terminal());
    assert_eq!(bed.sink.terminal_count(suggestion.id), 1);

    // Cost event for the LLM content match sits between start and terminal.
    assert!(events
        .iter()
        .any(|e| matches!(e, EventKind::Cost { operation, .. } if operation == "content_match")));
}

// ---------------------------------------------------------------------------
// Dead website scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dead_site_with_failed_autofix_is_never_auto_approved() {
    let mut bed = TestBed::new();
    bed.prober = Arc::new(MockProber::new()); // nothing responds
    bed.indices = vec![Arc::new(MockIndex::matching(
        "community_index",
        0.8,
        matching_org(),
    ))];

    let suggestion = dead_site_fixture();
    let outcome = bed
        .verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    // Remaining checks pass, but the dead site caps the decision.
    assert_eq!(outcome.status, SubmissionStatus::Flagged);
    assert!(outcome.reason.unwrap().contains("unreachable"));

    let logs = bed.store.logs();
    assert_eq!(logs.len(), 1);
    // Content match never ran — absent, not failed.
    assert!(logs[0].checks_summary.get("website_content_matches").is_none());
    // Reachability ran and failed.
    assert_eq!(
        logs[0].checks_summary["url_reachable"]["pass"],
        serde_json::Value::Bool(false)
    );

    // The failed fix attempt still cost money and was recorded.
    let events = bed.sink.for_suggestion(suggestion.id);
    assert!(events
        .iter()
        .any(|e| matches!(e, EventKind::Cost { operation, .. } if operation == "url_fix")));
}

#[tokio::test]
async fn successful_autofix_restores_the_full_pipeline() {
    let mut bed = TestBed::new();
    bed.prober = Arc::new(MockProber::new().with_pass_url("https://oakparkintake.org"));
    bed.analyst = Arc::new(
        MockAnalyst::new()
            .with_url_fix("https://oakparkintake.org")
            .with_content_match(true, 0.9),
    );
    bed.fetcher = Arc::new(MockFetcher::new().with_page("https://oakparkintake.org", ORG_PAGE));

    let suggestion = dead_site_fixture(); // submitted URL is dead
    let outcome = bed
        .verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    assert_eq!(outcome.status, SubmissionStatus::AutoApproved);

    let logs = bed.store.logs();
    let reachability = &logs[0].checks_summary["url_reachable"];
    assert_eq!(reachability["pass"], serde_json::Value::Bool(true));
    assert_eq!(
        reachability["evidence"]["fixed_url"],
        serde_json::Value::String("https://oakparkintake.org".to_string())
    );

    // Content was fetched from the repaired URL, so the match check ran.
    assert!(logs[0].checks_summary.get("website_content_matches").is_some());
}

#[tokio::test]
async fn malformed_url_never_launches_a_browser() {
    let mut bed = TestBed::new();
    bed.prober = Arc::new(MockProber::new());

    let mut suggestion = suggestion_fixture();
    suggestion.website = Some("not-a-url".to_string());

    let outcome = bed
        .verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    assert_eq!(bed.prober.calls(), 0);
    assert_ne!(outcome.status, SubmissionStatus::AutoApproved);
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identical_cross_reference_values_produce_no_conflicts() {
    let mut bed = TestBed::new();
    bed.indices = vec![Arc::new(MockIndex::matching(
        "community_index",
        0.95,
        matching_org(),
    ))];

    let suggestion = suggestion_fixture();
    bed.verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    let logs = bed.store.logs();
    assert!(logs[0].conflicts.is_empty());
    assert_eq!(
        logs[0].checks_summary["conflict_detection"]["pass"],
        serde_json::Value::Bool(true)
    );
}

#[tokio::test]
async fn divergent_cross_reference_phone_flags_a_conflict() {
    let mut bed = TestBed::new();
    let mut found = matching_org();
    found.phone = Some("(999) 000-1111".to_string());
    bed.indices = vec![Arc::new(MockIndex::matching("community_index", 0.95, found))];

    let suggestion = suggestion_fixture();
    let outcome = bed
        .verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    let logs = bed.store.logs();
    assert_eq!(logs[0].conflicts.len(), 1);
    assert_eq!(logs[0].conflicts[0].field, "phone");
    assert_eq!(logs[0].conflicts[0].source, "community_index");
    assert_eq!(
        logs[0].checks_summary["conflict_detection"]["pass"],
        serde_json::Value::Bool(false)
    );
    assert_ne!(outcome.status, SubmissionStatus::AutoApproved);
}

#[tokio::test]
async fn no_external_source_means_no_conflict_check() {
    // No indices, no content verdict: nothing to compare against.
    let bed = TestBed::new();

    let suggestion = suggestion_fixture();
    bed.verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    let logs = bed.store.logs();
    assert!(logs[0].checks_summary.get("conflict_detection").is_none());
    assert!(logs[0].checks_summary.get("cross_referenced").is_none());
}

// ---------------------------------------------------------------------------
// Provider outages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broken_geocoder_leaves_check_absent_rather_than_failed() {
    let mut bed = TestBed::new();
    bed.geocoder = Arc::new(MockGeocoder::Broken);

    let suggestion = suggestion_fixture();
    bed.verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    let logs = bed.store.logs();
    assert!(logs[0].checks_summary.get("address_geocodable").is_none());
    // The pass itself completed normally.
    assert_eq!(bed.sink.terminal_count(suggestion.id), 1);
}

// ---------------------------------------------------------------------------
// Batch behavior and the submission boundary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_closes_every_trace_exactly_once() {
    let mut bed = TestBed::new();
    bed.indices = vec![Arc::new(MockIndex::matching(
        "community_index",
        0.9,
        matching_org(),
    ))];

    let healthy = suggestion_fixture();
    let dead = dead_site_fixture();

    let outcome = bed
        .verifier()
        .verify_batch(&[healthy.clone(), dead.clone()], VerificationType::Initial)
        .await;

    assert_eq!(outcome.outcomes.len(), 2);
    assert_eq!(bed.sink.terminal_count(healthy.id), 1);
    assert_eq!(bed.sink.terminal_count(dead.id), 1);
    assert_eq!(bed.store.logs().len(), 2);
}

/// Sink that drops progress events, simulating event-store trouble mid-pass.
struct FlakySink {
    inner: MemorySink,
}

#[async_trait]
impl EventSink for FlakySink {
    async fn emit(&self, suggestion_id: Uuid, kind: EventKind) -> Result<()> {
        if matches!(kind, EventKind::Progress { .. }) {
            return Err(anyhow!("event store rejected the write"));
        }
        self.inner.emit(suggestion_id, kind).await
    }
}

#[tokio::test]
async fn mid_pass_fault_flags_for_human_and_still_closes_the_trace() {
    let sink = Arc::new(FlakySink {
        inner: MemorySink::new(),
    });
    let store = Arc::new(MemoryLogStore::new());

    let verifier = Verifier::new(
        VerifierDeps {
            prober: Arc::new(MockProber::new().with_pass_url("https://oakparkintake.org")),
            geocoder: Arc::new(MockGeocoder::hit()),
            fetcher: Arc::new(MockFetcher::new()),
            analyst: Arc::new(MockAnalyst::new()),
            indices: Vec::new(),
            sink: sink.clone(),
            store: store.clone(),
        },
        VerifierConfig::default(),
    );

    let suggestion = suggestion_fixture();
    let outcome = verifier
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    // The fault surfaces as an error status, never a crash.
    assert_eq!(outcome.status, SubmissionStatus::Error);

    // The log still exists and routes to a human.
    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].decision, Decision::FlagForHuman);
    assert!(logs[0].decision_reason.contains("verification error"));

    // Terminal failed event got through the flaky sink.
    let events = sink.inner.for_suggestion(suggestion.id);
    assert!(matches!(events.last(), Some(EventKind::Failed { .. })));
}

#[tokio::test]
async fn costs_are_ledgered_once_per_llm_invocation() {
    let mut bed = TestBed::new();
    bed.prober = Arc::new(MockProber::new().with_pass_url("https://fixed.example"));
    bed.analyst = Arc::new(
        MockAnalyst::new()
            .with_url_fix("https://fixed.example")
            .with_content_match(true, 0.9),
    );
    bed.fetcher = Arc::new(MockFetcher::new().with_page("https://fixed.example", ORG_PAGE));

    let suggestion = dead_site_fixture();
    bed.verifier()
        .verify_one(&suggestion, VerificationType::Initial)
        .await;

    let rows = bed.store.cost_rows();
    assert_eq!(rows.len(), 1);
    let ops: Vec<&str> = rows[0].1.iter().map(|e| e.operation.as_str()).collect();
    assert_eq!(ops, vec!["url_fix", "content_match"]);

    for entry in &rows[0].1 {
        assert!(entry.cost_usd > 0.0);
        assert_eq!(entry.input_tokens, MOCK_USAGE.input_tokens);
    }
}
