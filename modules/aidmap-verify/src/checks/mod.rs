pub mod content;
pub mod cross_reference;
pub mod geocode;
pub mod phone;
pub mod reachability;

use serde::{Deserialize, Serialize};

/// The closed set of verification checks. One weight per kind (see
/// [`crate::scoring`]); a kind that never ran is simply absent from the bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    UrlReachable,
    PhoneValid,
    AddressGeocodable,
    WebsiteContentMatches,
    CrossReferenced,
    ConflictDetection,
}

impl CheckKind {
    pub fn weight(self) -> f64 {
        match self {
            CheckKind::UrlReachable => 0.15,
            CheckKind::PhoneValid => 0.15,
            CheckKind::AddressGeocodable => 0.20,
            CheckKind::WebsiteContentMatches => 0.20,
            CheckKind::CrossReferenced => 0.20,
            CheckKind::ConflictDetection => 0.10,
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckKind::UrlReachable => write!(f, "url_reachable"),
            CheckKind::PhoneValid => write!(f, "phone_valid"),
            CheckKind::AddressGeocodable => write!(f, "address_geocodable"),
            CheckKind::WebsiteContentMatches => write!(f, "website_content_matches"),
            CheckKind::CrossReferenced => write!(f, "cross_referenced"),
            CheckKind::ConflictDetection => write!(f, "conflict_detection"),
        }
    }
}

/// Result of one check: pass/fail, optional confidence in a passing result,
/// and whatever evidence the check produced (kept for the log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub pass: bool,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub evidence: serde_json::Value,
}

impl CheckOutcome {
    pub fn new(pass: bool, confidence: Option<f64>, evidence: &impl Serialize) -> Self {
        Self {
            pass,
            confidence,
            evidence: serde_json::to_value(evidence).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Transient bag of per-check results for one verification pass.
///
/// Only checks that actually ran are present; a provider outage leaves its
/// check absent so the scorer excludes it from the denominator too.
#[derive(Debug, Clone, Default)]
pub struct VerificationChecks {
    entries: Vec<(CheckKind, CheckOutcome)>,
}

impl VerificationChecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a check result. Re-recording a kind replaces the earlier entry
    /// (an auto-fixed URL overwrites the original failed reachability).
    pub fn record(&mut self, kind: CheckKind, outcome: CheckOutcome) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = outcome;
        } else {
            self.entries.push((kind, outcome));
        }
    }

    pub fn get(&self, kind: CheckKind) -> Option<&CheckOutcome> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, o)| o)
    }

    pub fn entries(&self) -> &[(CheckKind, CheckOutcome)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON summary for the verification log: `{check_name: outcome}`.
    pub fn summary(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (kind, outcome) in &self.entries {
            map.insert(
                kind.to_string(),
                serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null),
            );
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_replaces_same_kind() {
        let mut checks = VerificationChecks::new();
        checks.record(
            CheckKind::UrlReachable,
            CheckOutcome::new(false, None, &"dead"),
        );
        checks.record(
            CheckKind::UrlReachable,
            CheckOutcome::new(true, None, &"fixed"),
        );

        assert_eq!(checks.entries().len(), 1);
        assert!(checks.get(CheckKind::UrlReachable).unwrap().pass);
    }

    #[test]
    fn summary_keys_by_check_name() {
        let mut checks = VerificationChecks::new();
        checks.record(CheckKind::PhoneValid, CheckOutcome::new(true, None, &()));

        let summary = checks.summary();
        assert!(summary.get("phone_valid").is_some());
    }
}
