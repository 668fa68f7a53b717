//! Combines check outcomes into one weighted confidence score.

use crate::checks::VerificationChecks;

/// Weighted score over the checks that actually ran.
///
/// Each present check contributes `weight × (pass ? confidence-or-1 : 0)`;
/// the total is divided by the sum of weights of *present* checks, so a
/// check that never ran neither helps nor hurts. Zero checks → 0.0.
pub fn score(checks: &VerificationChecks) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;

    for (kind, outcome) in checks.entries() {
        let weight = kind.weight();
        weight_sum += weight;

        if outcome.pass {
            total += weight * outcome.confidence.unwrap_or(1.0);
        }
    }

    if weight_sum == 0.0 {
        return 0.0;
    }

    total / weight_sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{CheckKind, CheckOutcome, VerificationChecks};

    fn outcome(pass: bool, confidence: Option<f64>) -> CheckOutcome {
        CheckOutcome::new(pass, confidence, &())
    }

    #[test]
    fn zero_checks_scores_zero() {
        assert_eq!(score(&VerificationChecks::new()), 0.0);
    }

    #[test]
    fn all_passing_full_confidence_scores_one() {
        let mut checks = VerificationChecks::new();
        for kind in [
            CheckKind::UrlReachable,
            CheckKind::PhoneValid,
            CheckKind::AddressGeocodable,
            CheckKind::WebsiteContentMatches,
            CheckKind::CrossReferenced,
            CheckKind::ConflictDetection,
        ] {
            checks.record(kind, outcome(true, None));
        }

        assert!((score(&checks) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failing_check_contributes_zero_but_stays_in_denominator() {
        let mut checks = VerificationChecks::new();
        checks.record(CheckKind::PhoneValid, outcome(true, None));
        checks.record(CheckKind::UrlReachable, outcome(false, None));

        // 0.15 / (0.15 + 0.15)
        assert!((score(&checks) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn absent_checks_do_not_depress_the_score() {
        let mut checks = VerificationChecks::new();
        checks.record(CheckKind::PhoneValid, outcome(true, None));

        assert!((score(&checks) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_scales_contribution() {
        let mut checks = VerificationChecks::new();
        checks.record(CheckKind::AddressGeocodable, outcome(true, Some(0.9)));

        assert!((score(&checks) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn order_invariant() {
        let kinds = [
            (CheckKind::UrlReachable, outcome(true, None)),
            (CheckKind::PhoneValid, outcome(false, None)),
            (CheckKind::AddressGeocodable, outcome(true, Some(0.9))),
            (CheckKind::CrossReferenced, outcome(true, Some(0.7))),
            (CheckKind::ConflictDetection, outcome(true, None)),
        ];

        let mut forward = VerificationChecks::new();
        for (kind, o) in kinds.iter().cloned() {
            forward.record(kind, o);
        }

        let mut reversed = VerificationChecks::new();
        for (kind, o) in kinds.iter().rev().cloned() {
            reversed.record(kind, o);
        }

        // A rotation too, not just the reversal.
        let mut rotated = VerificationChecks::new();
        for (kind, o) in kinds.iter().cycle().skip(2).take(kinds.len()).cloned() {
            rotated.record(kind, o);
        }

        assert_eq!(score(&forward), score(&reversed));
        assert_eq!(score(&forward), score(&rotated));
    }

    #[test]
    fn dead_site_scenario_scores_from_remaining_checks() {
        // website unreachable, content match absent; the rest pass.
        let mut checks = VerificationChecks::new();
        checks.record(CheckKind::UrlReachable, outcome(false, None));
        checks.record(CheckKind::PhoneValid, outcome(true, None));
        checks.record(CheckKind::AddressGeocodable, outcome(true, Some(0.9)));
        checks.record(CheckKind::CrossReferenced, outcome(true, Some(0.8)));
        checks.record(CheckKind::ConflictDetection, outcome(true, None));

        // (0.15*0 + 0.15 + 0.2*0.9 + 0.2*0.8 + 0.1) / 0.8
        let expected = (0.15 + 0.18 + 0.16 + 0.10) / 0.80;
        assert!((score(&checks) - expected).abs() < 1e-9);
    }
}
