//! Dead-URL repair: ask the analyst for the organization's official site,
//! then trust nothing until the candidate independently passes reachability.

use aidmap_common::Suggestion;
use tracing::{info, warn};

use crate::analyst::Analyst;
use crate::checks::reachability::{check_reachability, ReachabilityCheck, UrlProber};
use crate::cost::{CostEntry, CostTracker};

/// Model reply meaning "no official site exists".
const NOT_FOUND_SENTINEL: &str = "not found";

#[derive(Debug, Clone)]
pub struct AutoFixOutcome {
    pub fixed: bool,
    pub new_url: Option<String>,
    /// Reachability evidence for the accepted replacement URL.
    pub reachability: Option<ReachabilityCheck>,
    /// Ledger entry for the LLM invocation, when one completed.
    pub cost: Option<CostEntry>,
}

impl AutoFixOutcome {
    fn miss(cost: Option<CostEntry>) -> Self {
        Self {
            fixed: false,
            new_url: None,
            reachability: None,
            cost,
        }
    }
}

/// Attempt to replace a dead website URL.
///
/// The analyst reply must be a bare URL (or the sentinel); anything else is a
/// miss. A candidate only counts as fixed after it passes its own
/// reachability probe. Token cost is recorded for every completed invocation
/// regardless of outcome; an analyst transport error leaves the fix
/// unavailable without failing the pass.
pub async fn attempt_url_fix(
    analyst: &dyn Analyst,
    prober: &dyn UrlProber,
    cost: &CostTracker,
    suggestion: &Suggestion,
    dead_url: &str,
) -> AutoFixOutcome {
    let reply = match analyst.find_official_url(suggestion, dead_url).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(org = %suggestion.name, dead_url, error = %e, "URL fix analyst unavailable");
            return AutoFixOutcome::miss(None);
        }
    };

    let entry = cost.record_llm(
        analyst.provider(),
        analyst.model(),
        "url_fix",
        reply.usage,
        serde_json::json!({
            "organization": suggestion.name,
            "dead_url": dead_url,
        }),
    );

    let candidate = reply.value.trim().to_string();

    if candidate.eq_ignore_ascii_case(NOT_FOUND_SENTINEL) {
        info!(org = %suggestion.name, dead_url, "No official site found");
        return AutoFixOutcome::miss(Some(entry));
    }

    if !candidate.starts_with("http://") && !candidate.starts_with("https://") {
        warn!(org = %suggestion.name, reply = %candidate, "URL fix reply was not a URL");
        return AutoFixOutcome::miss(Some(entry));
    }

    // Never trust the model's URL without an independent probe.
    cost.count_api_call();
    let recheck = check_reachability(prober, &candidate).await;

    if recheck.pass {
        info!(org = %suggestion.name, dead_url, new_url = %candidate, "URL auto-fixed");
        AutoFixOutcome {
            fixed: true,
            new_url: Some(candidate),
            reachability: Some(recheck),
            cost: Some(entry),
        }
    } else {
        warn!(org = %suggestion.name, candidate = %candidate, "URL fix candidate failed re-verification");
        AutoFixOutcome::miss(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{suggestion_fixture, MockAnalyst, MockProber};

    #[tokio::test]
    async fn candidate_that_passes_reprobe_is_accepted() {
        let analyst = MockAnalyst::new().with_url_fix("https://oakparkintake.org");
        let prober = MockProber::new().with_pass_url("https://oakparkintake.org");
        let cost = CostTracker::new();
        let suggestion = suggestion_fixture();

        let outcome =
            attempt_url_fix(&analyst, &prober, &cost, &suggestion, "https://dead.example").await;

        assert!(outcome.fixed);
        assert_eq!(outcome.new_url.as_deref(), Some("https://oakparkintake.org"));
        assert_eq!(prober.calls(), 1);
        assert_eq!(cost.entries().len(), 1);
        assert_eq!(cost.entries()[0].operation, "url_fix");
    }

    #[tokio::test]
    async fn candidate_that_fails_reprobe_is_rejected() {
        let analyst = MockAnalyst::new().with_url_fix("https://still-dead.example");
        let prober = MockProber::new(); // nothing passes
        let cost = CostTracker::new();
        let suggestion = suggestion_fixture();

        let outcome =
            attempt_url_fix(&analyst, &prober, &cost, &suggestion, "https://dead.example").await;

        assert!(!outcome.fixed);
        assert!(outcome.new_url.is_none());
        // Cost still recorded for the miss.
        assert_eq!(cost.entries().len(), 1);
    }

    #[tokio::test]
    async fn sentinel_reply_is_a_miss_with_cost() {
        let analyst = MockAnalyst::new(); // replies "not found"
        let prober = MockProber::new();
        let cost = CostTracker::new();
        let suggestion = suggestion_fixture();

        let outcome =
            attempt_url_fix(&analyst, &prober, &cost, &suggestion, "https://dead.example").await;

        assert!(!outcome.fixed);
        assert_eq!(prober.calls(), 0);
        assert_eq!(cost.entries().len(), 1);
    }

    #[tokio::test]
    async fn prose_reply_is_a_miss() {
        let analyst =
            MockAnalyst::new().with_url_fix("I believe the site is https://oakparkintake.org");
        let prober = MockProber::new().with_pass_url("https://oakparkintake.org");
        let cost = CostTracker::new();
        let suggestion = suggestion_fixture();

        let outcome =
            attempt_url_fix(&analyst, &prober, &cost, &suggestion, "https://dead.example").await;

        assert!(!outcome.fixed);
        assert_eq!(prober.calls(), 0);
    }

    #[tokio::test]
    async fn analyst_error_is_a_quiet_miss() {
        let analyst = MockAnalyst::new().failing();
        let prober = MockProber::new();
        let cost = CostTracker::new();
        let suggestion = suggestion_fixture();

        let outcome =
            attempt_url_fix(&analyst, &prober, &cost, &suggestion, "https://dead.example").await;

        assert!(!outcome.fixed);
        assert!(outcome.cost.is_none());
        assert_eq!(cost.entries().len(), 0);
    }
}
