//! Validated batch-intake boundary.
//!
//! Submissions arrive as an explicit schema and are rejected early with a
//! structured error list; nothing duck-typed leaks into the pipeline.
//! Deduplication against the existing directory is the caller's job — the
//! `Duplicate` status exists so callers can report it alongside pipeline
//! outcomes.

use aidmap_common::{Decision, Suggestion};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Submissions per request are capped to keep a batch's trace debuggable.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSubmission {
    pub submitted_by: String,
    pub notes: Option<String>,
    pub suggestions: Vec<Suggestion>,
}

/// One structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeError {
    /// Index of the offending suggestion, or `None` for batch-level errors.
    pub index: Option<usize>,
    pub field: String,
    pub message: String,
}

/// Validate a batch before any verification work starts.
/// Returns every problem found, not just the first.
pub fn validate_batch(batch: &BatchSubmission) -> Vec<IntakeError> {
    let mut errors = Vec::new();

    if batch.submitted_by.trim().is_empty() {
        errors.push(IntakeError {
            index: None,
            field: "submitted_by".to_string(),
            message: "submitter identity is required".to_string(),
        });
    }

    if batch.suggestions.is_empty() {
        errors.push(IntakeError {
            index: None,
            field: "suggestions".to_string(),
            message: "batch contains no suggestions".to_string(),
        });
    }

    if batch.suggestions.len() > MAX_BATCH_SIZE {
        errors.push(IntakeError {
            index: None,
            field: "suggestions".to_string(),
            message: format!(
                "batch of {} exceeds the {MAX_BATCH_SIZE}-suggestion cap",
                batch.suggestions.len()
            ),
        });
    }

    for (index, suggestion) in batch.suggestions.iter().enumerate() {
        if suggestion.name.trim().is_empty() {
            errors.push(IntakeError {
                index: Some(index),
                field: "name".to_string(),
                message: "organization name is required".to_string(),
            });
        }

        let has_contact = [
            suggestion.phone.as_deref(),
            suggestion.website.as_deref(),
            suggestion.email.as_deref(),
            suggestion.address.as_deref(),
        ]
        .iter()
        .any(|f| f.map(|v| !v.trim().is_empty()).unwrap_or(false));

        if !has_contact {
            errors.push(IntakeError {
                index: Some(index),
                field: "contact".to_string(),
                message: "at least one of phone, website, email, or address is required"
                    .to_string(),
            });
        }
    }

    errors
}

/// Per-resource status reported back to the batch caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Accepted and stored; verification pending.
    Submitted,
    AutoApproved,
    Flagged,
    Rejected,
    /// Intake matched an existing directory entry.
    Duplicate,
    Error,
}

impl From<Decision> for SubmissionStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::AutoApprove => SubmissionStatus::AutoApproved,
            Decision::FlagForHuman => SubmissionStatus::Flagged,
            Decision::AutoReject => SubmissionStatus::Rejected,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Submitted => write!(f, "submitted"),
            SubmissionStatus::AutoApproved => write!(f, "auto_approved"),
            SubmissionStatus::Flagged => write!(f, "flagged"),
            SubmissionStatus::Rejected => write!(f, "rejected"),
            SubmissionStatus::Duplicate => write!(f, "duplicate"),
            SubmissionStatus::Error => write!(f, "error"),
        }
    }
}

/// Outcome for one suggestion in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceOutcome {
    pub suggestion_id: Uuid,
    pub status: SubmissionStatus,
    pub reason: Option<String>,
    pub score: Option<f64>,
}

/// Aggregate result of one batch run. Every suggestion appears exactly once.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub outcomes: Vec<ResourceOutcome>,
}

impl BatchOutcome {
    pub fn push(&mut self, outcome: ResourceOutcome) {
        self.outcomes.push(outcome);
    }

    fn count(&self, status: SubmissionStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

impl std::fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Verification Batch Complete ===")?;
        writeln!(f, "Suggestions:    {}", self.outcomes.len())?;
        writeln!(
            f,
            "Auto-approved:  {}",
            self.count(SubmissionStatus::AutoApproved)
        )?;
        writeln!(f, "Flagged:        {}", self.count(SubmissionStatus::Flagged))?;
        writeln!(
            f,
            "Auto-rejected:  {}",
            self.count(SubmissionStatus::Rejected)
        )?;
        writeln!(f, "Errors:         {}", self.count(SubmissionStatus::Error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::suggestion_fixture;

    fn batch_of(suggestions: Vec<Suggestion>) -> BatchSubmission {
        BatchSubmission {
            submitted_by: "agent:discovery-v2".to_string(),
            notes: None,
            suggestions,
        }
    }

    #[test]
    fn valid_batch_passes() {
        let batch = batch_of(vec![suggestion_fixture()]);
        assert!(validate_batch(&batch).is_empty());
    }

    #[test]
    fn empty_batch_is_rejected() {
        let errors = validate_batch(&batch_of(vec![]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "suggestions");
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let batch = batch_of(vec![suggestion_fixture(); MAX_BATCH_SIZE + 1]);
        let errors = validate_batch(&batch);
        assert!(errors.iter().any(|e| e.message.contains("cap")));
    }

    #[test]
    fn missing_submitter_and_name_are_both_reported() {
        let mut suggestion = suggestion_fixture();
        suggestion.name = "  ".to_string();

        let mut batch = batch_of(vec![suggestion]);
        batch.submitted_by = String::new();

        let errors = validate_batch(&batch);
        assert!(errors.iter().any(|e| e.field == "submitted_by"));
        assert!(errors
            .iter()
            .any(|e| e.field == "name" && e.index == Some(0)));
    }

    #[test]
    fn contactless_suggestion_is_rejected() {
        let mut suggestion = suggestion_fixture();
        suggestion.phone = None;
        suggestion.website = None;
        suggestion.email = None;
        suggestion.address = None;

        let errors = validate_batch(&batch_of(vec![suggestion]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "contact");
    }

    #[test]
    fn decision_maps_onto_status() {
        assert_eq!(
            SubmissionStatus::from(Decision::AutoApprove),
            SubmissionStatus::AutoApproved
        );
        assert_eq!(
            SubmissionStatus::from(Decision::FlagForHuman),
            SubmissionStatus::Flagged
        );
        assert_eq!(
            SubmissionStatus::from(Decision::AutoReject),
            SubmissionStatus::Rejected
        );
    }
}
