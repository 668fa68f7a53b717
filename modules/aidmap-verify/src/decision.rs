use aidmap_common::{Config, Decision};
use serde::Serialize;

/// Score cutoffs for the three-way decision. Values here are operating
/// defaults tuned toward the target approve/flag/reject ratios; override via
/// `DECISION_APPROVE_THRESHOLD` / `DECISION_REJECT_THRESHOLD`.
#[derive(Debug, Clone, Copy)]
pub struct DecisionThresholds {
    pub auto_approve: f64,
    pub auto_reject: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 0.85,
            auto_reject: 0.50,
        }
    }
}

impl DecisionThresholds {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            auto_approve: config.approve_threshold.unwrap_or(defaults.auto_approve),
            auto_reject: config.reject_threshold.unwrap_or(defaults.auto_reject),
        }
    }
}

/// Conditions that block auto-approval no matter how high the score is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardFail {
    /// Website unreachable and the auto-fixer produced no working URL.
    DeadWebsite,
    /// Phone number failed format validation.
    InvalidPhone,
}

impl std::fmt::Display for HardFail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HardFail::DeadWebsite => write!(f, "website unreachable with no working replacement"),
            HardFail::InvalidPhone => write!(f, "phone number is invalid"),
        }
    }
}

/// Map a score and any hard-fail signals to a decision plus a human-readable
/// reason.
///
/// Monotonic in score: raising the score with thresholds fixed never moves
/// the outcome toward rejection. Hard fails cap the outcome at
/// `FlagForHuman` — they never force an outright rejection on their own.
pub fn decide(
    score: f64,
    hard_fails: &[HardFail],
    thresholds: &DecisionThresholds,
) -> (Decision, String) {
    if score < thresholds.auto_reject {
        return (
            Decision::AutoReject,
            format!(
                "confidence {score:.2} below auto-reject threshold {:.2}",
                thresholds.auto_reject
            ),
        );
    }

    if !hard_fails.is_empty() {
        let reasons: Vec<String> = hard_fails.iter().map(|h| h.to_string()).collect();
        return (
            Decision::FlagForHuman,
            format!(
                "confidence {score:.2} but needs review: {}",
                reasons.join("; ")
            ),
        );
    }

    if score >= thresholds.auto_approve {
        return (
            Decision::AutoApprove,
            format!(
                "confidence {score:.2} at or above auto-approve threshold {:.2}",
                thresholds.auto_approve
            ),
        );
    }

    (
        Decision::FlagForHuman,
        format!(
            "confidence {score:.2} between thresholds ({:.2}-{:.2})",
            thresholds.auto_reject, thresholds.auto_approve
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(d: Decision) -> u8 {
        match d {
            Decision::AutoReject => 0,
            Decision::FlagForHuman => 1,
            Decision::AutoApprove => 2,
        }
    }

    #[test]
    fn bands_map_to_three_decisions() {
        let t = DecisionThresholds::default();

        assert_eq!(decide(0.95, &[], &t).0, Decision::AutoApprove);
        assert_eq!(decide(0.70, &[], &t).0, Decision::FlagForHuman);
        assert_eq!(decide(0.20, &[], &t).0, Decision::AutoReject);
    }

    #[test]
    fn boundaries_are_inclusive_for_approve_exclusive_for_reject() {
        let t = DecisionThresholds::default();

        assert_eq!(decide(0.85, &[], &t).0, Decision::AutoApprove);
        assert_eq!(decide(0.50, &[], &t).0, Decision::FlagForHuman);
    }

    #[test]
    fn hard_fail_caps_high_score_at_flag() {
        let t = DecisionThresholds::default();
        let (decision, reason) = decide(0.95, &[HardFail::DeadWebsite], &t);

        assert_eq!(decision, Decision::FlagForHuman);
        assert!(reason.contains("unreachable"));
    }

    #[test]
    fn hard_fail_does_not_rescue_a_reject() {
        let t = DecisionThresholds::default();
        assert_eq!(
            decide(0.10, &[HardFail::InvalidPhone], &t).0,
            Decision::AutoReject
        );
    }

    #[test]
    fn monotonic_in_score() {
        let t = DecisionThresholds::default();

        for hard_fails in [vec![], vec![HardFail::InvalidPhone]] {
            let mut last = 0;
            for step in 0..=100 {
                let score = step as f64 / 100.0;
                let r = rank(decide(score, &hard_fails, &t).0);
                assert!(
                    r >= last,
                    "decision regressed at score {score} (hard_fails={hard_fails:?})"
                );
                last = r;
            }
        }
    }

    #[test]
    fn default_thresholds_match_operating_targets() {
        let thresholds = DecisionThresholds::default();
        assert_eq!(thresholds.auto_approve, 0.85);
        assert_eq!(thresholds.auto_reject, 0.50);
    }

    #[test]
    fn every_decision_carries_a_reason() {
        let t = DecisionThresholds::default();
        for score in [0.1, 0.6, 0.99] {
            let (_, reason) = decide(score, &[], &t);
            assert!(!reason.is_empty());
        }
    }
}
