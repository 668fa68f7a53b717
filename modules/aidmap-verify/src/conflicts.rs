use aidmap_common::{FieldConflict, Suggestion};

use crate::checks::cross_reference::FoundOrganization;

/// Below this similarity, a submitted/found pair is flagged as a conflict.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Fraction of position-aligned matching characters over the longer string's
/// length. Deliberately cheap — not edit distance. Strings that differ only
/// by an insertion or deletion score low; acceptable for the coarse
/// flag-for-human purpose this feeds, and the decision thresholds were tuned
/// against this metric.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let longer = a_chars.len().max(b_chars.len());
    if longer == 0 {
        return 1.0;
    }

    let matching = a_chars
        .iter()
        .zip(b_chars.iter())
        .filter(|(x, y)| x == y)
        .count();

    matching as f64 / longer as f64
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Compare submitted field values against values found by an external source
/// and flag each field that diverges beyond the threshold.
///
/// Checked fields: name, phone, website, address, email. A field missing on
/// either side is skipped; identical normalized values never conflict.
pub fn detect_conflicts(
    suggestion: &Suggestion,
    found: &FoundOrganization,
    source: &str,
    threshold: f64,
) -> Vec<FieldConflict> {
    let pairs: [(&str, Option<&String>, Option<&String>); 5] = [
        ("name", Some(&suggestion.name), found.name.as_ref()),
        ("phone", suggestion.phone.as_ref(), found.phone.as_ref()),
        ("website", suggestion.website.as_ref(), found.website.as_ref()),
        ("address", suggestion.address.as_ref(), found.address.as_ref()),
        ("email", suggestion.email.as_ref(), found.email.as_ref()),
    ];

    let mut conflicts = Vec::new();

    for (field, submitted, found_value) in pairs {
        let (Some(submitted), Some(found_value)) = (submitted, found_value) else {
            continue;
        };

        let submitted_norm = normalize(submitted);
        let found_norm = normalize(found_value);

        if submitted_norm.is_empty() || found_norm.is_empty() {
            continue;
        }
        if submitted_norm == found_norm {
            continue;
        }

        let sim = similarity(&submitted_norm, &found_norm);
        if sim < threshold {
            conflicts.push(FieldConflict {
                field: field.to_string(),
                submitted_value: submitted.clone(),
                found_value: found_value.clone(),
                confidence: 1.0 - sim,
                source: source.to_string(),
            });
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::suggestion_fixture;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("oak park", "oak park"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn empty_pair_scores_one() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn positional_shift_undercounts() {
        // One-character insertion misaligns everything after it. Known
        // property of the cheap metric.
        let sim = similarity("oak park", "the oak park");
        assert!(sim < 0.3, "got {sim}");
    }

    #[test]
    fn identical_normalized_values_never_conflict() {
        let suggestion = suggestion_fixture();
        let found = FoundOrganization {
            name: Some(suggestion.name.to_uppercase()),
            phone: suggestion.phone.clone(),
            website: suggestion.website.clone(),
            address: suggestion.address.as_ref().map(|a| format!("  {a}  ")),
            email: suggestion.email.clone(),
        };

        let conflicts = detect_conflicts(&suggestion, &found, "index", DEFAULT_SIMILARITY_THRESHOLD);
        assert!(conflicts.is_empty(), "got {conflicts:?}");
    }

    #[test]
    fn divergent_phone_is_flagged_with_inverse_confidence() {
        let suggestion = suggestion_fixture();
        let found = FoundOrganization {
            phone: Some("(999) 000-1111".to_string()),
            ..FoundOrganization::default()
        };

        let conflicts = detect_conflicts(&suggestion, &found, "places", DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(conflicts.len(), 1);

        let conflict = &conflicts[0];
        assert_eq!(conflict.field, "phone");
        assert_eq!(conflict.source, "places");
        assert!(conflict.confidence > 0.3);

        let sim = similarity(
            &conflict.submitted_value.trim().to_lowercase(),
            &conflict.found_value.trim().to_lowercase(),
        );
        assert!((conflict.confidence - (1.0 - sim)).abs() < 1e-9);
    }

    #[test]
    fn missing_side_is_skipped() {
        let suggestion = suggestion_fixture();
        let found = FoundOrganization::default();

        assert!(detect_conflicts(&suggestion, &found, "index", DEFAULT_SIMILARITY_THRESHOLD)
            .is_empty());
    }

    #[test]
    fn near_match_above_threshold_is_not_flagged() {
        let suggestion = suggestion_fixture();
        // Same length, one character apart — similarity well above 0.7.
        let found = FoundOrganization {
            name: Some("Oak Park Intake Zenter".to_string()),
            ..FoundOrganization::default()
        };

        let conflicts = detect_conflicts(&suggestion, &found, "index", DEFAULT_SIMILARITY_THRESHOLD);
        assert!(conflicts.is_empty(), "got {conflicts:?}");
    }
}
