//! Converts LLM token usage into USD and keeps the per-pass ledger.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ai_client::TokenUsage;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// USD per million tokens for a model family.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

const HAIKU: ModelPricing = ModelPricing {
    input_per_mtok: 1.00,
    output_per_mtok: 5.00,
};
const SONNET: ModelPricing = ModelPricing {
    input_per_mtok: 3.00,
    output_per_mtok: 15.00,
};
const OPUS: ModelPricing = ModelPricing {
    input_per_mtok: 15.00,
    output_per_mtok: 75.00,
};

/// Price table keyed by model id substring. Unknown models are billed at the
/// highest family rate so spend is never underestimated.
pub fn pricing_for(model: &str) -> ModelPricing {
    if model.contains("haiku") {
        HAIKU
    } else if model.contains("sonnet") {
        SONNET
    } else {
        OPUS
    }
}

pub fn usage_cost_usd(model: &str, usage: TokenUsage) -> f64 {
    let pricing = pricing_for(model);
    (usage.input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok
        + (usage.output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok
}

/// One ledger row: a single LLM invocation with enough context to audit
/// spend per feature.
#[derive(Debug, Clone, Serialize)]
pub struct CostEntry {
    pub provider: String,
    pub model: String,
    pub operation: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Accumulates spend and external-call counts for one verification pass.
#[derive(Default)]
pub struct CostTracker {
    entries: Mutex<Vec<CostEntry>>,
    api_calls: AtomicU32,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one LLM invocation. Returns the entry so the caller can also
    /// emit it as a cost event.
    pub fn record_llm(
        &self,
        provider: &str,
        model: &str,
        operation: &str,
        usage: TokenUsage,
        context: serde_json::Value,
    ) -> CostEntry {
        let entry = CostEntry {
            provider: provider.to_string(),
            model: model.to_string(),
            operation: operation.to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost_usd: usage_cost_usd(model, usage),
            context,
            created_at: Utc::now(),
        };

        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().unwrap().push(entry.clone());
        entry
    }

    /// Count a non-LLM external call (probe, geocode, index lookup, fetch).
    pub fn count_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn api_call_count(&self) -> u32 {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.entries.lock().unwrap().iter().map(|e| e.cost_usd).sum()
    }

    pub fn entries(&self) -> Vec<CostEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u32, output: u32) -> TokenUsage {
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
        }
    }

    #[test]
    fn haiku_cost_math() {
        // 100k input + 10k output on haiku: 0.1*1.00 + 0.01*5.00 = 0.15
        let cost = usage_cost_usd("claude-haiku-4-5-20251001", usage(100_000, 10_000));
        assert!((cost - 0.15).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn sonnet_costs_more_than_haiku() {
        let u = usage(50_000, 5_000);
        assert!(usage_cost_usd("claude-sonnet-4-5", u) > usage_cost_usd("claude-haiku-4-5", u));
    }

    #[test]
    fn unknown_model_billed_at_top_rate() {
        let u = usage(1_000_000, 0);
        assert_eq!(usage_cost_usd("mystery-model", u), OPUS.input_per_mtok);
    }

    #[test]
    fn tracker_accumulates_entries_and_calls() {
        let tracker = CostTracker::new();
        tracker.count_api_call();
        tracker.record_llm(
            "anthropic",
            "claude-haiku-4-5",
            "content_match",
            usage(100_000, 10_000),
            serde_json::json!({"org": "Oak Park Intake Center"}),
        );
        tracker.record_llm(
            "anthropic",
            "claude-haiku-4-5",
            "url_fix",
            usage(100_000, 10_000),
            serde_json::Value::Null,
        );

        assert_eq!(tracker.api_call_count(), 3);
        assert_eq!(tracker.entries().len(), 2);
        assert!((tracker.total_cost_usd() - 0.30).abs() < 1e-9);
    }

    #[test]
    fn zero_usage_costs_nothing() {
        assert_eq!(usage_cost_usd("claude-haiku-4-5", usage(0, 0)), 0.0);
    }
}
