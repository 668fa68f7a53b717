use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Terminal classification of a verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    AutoApprove,
    FlagForHuman,
    AutoReject,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::AutoApprove => write!(f, "auto_approve"),
            Decision::FlagForHuman => write!(f, "flag_for_human"),
            Decision::AutoReject => write!(f, "auto_reject"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_approve" => Ok(Decision::AutoApprove),
            "flag_for_human" => Ok(Decision::FlagForHuman),
            "auto_reject" => Ok(Decision::AutoReject),
            other => Err(format!("unknown decision: {other}")),
        }
    }
}

/// Why a verification pass was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    /// First pass on a freshly submitted suggestion.
    Initial,
    /// Cadence-driven re-check of an already published resource.
    Periodic,
    /// Triggered by a user report of stale or wrong data.
    Reported,
}

impl std::fmt::Display for VerificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationType::Initial => write!(f, "initial"),
            VerificationType::Periodic => write!(f, "periodic"),
            VerificationType::Reported => write!(f, "reported"),
        }
    }
}

impl std::str::FromStr for VerificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(VerificationType::Initial),
            "periodic" => Ok(VerificationType::Periodic),
            "reported" => Ok(VerificationType::Reported),
            other => Err(format!("unknown verification type: {other}")),
        }
    }
}

/// How a suggestion entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionOrigin {
    /// Found by a discovery agent crawling the open web.
    AgentDiscovered,
    /// Pushed by a partner organization's data feed.
    PartnerFeed,
    /// Typed in by a member of the public.
    PublicSubmission,
}

impl std::fmt::Display for SuggestionOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestionOrigin::AgentDiscovered => write!(f, "agent_discovered"),
            SuggestionOrigin::PartnerFeed => write!(f, "partner_feed"),
            SuggestionOrigin::PublicSubmission => write!(f, "public_submission"),
        }
    }
}

// --- Suggestion ---

/// A candidate directory entry awaiting verification.
///
/// Read-only input to the pipeline: decisions are recorded in the
/// verification log, never written back onto the suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub eligibility: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub accessibility: Vec<String>,
    pub hours: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub origin: SuggestionOrigin,
    /// Where the suggestion was discovered (listing page, feed item, etc.).
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    /// Full single-line address for geocoding and cross-reference queries.
    pub fn full_address(&self) -> Option<String> {
        let street = self.address.as_deref()?.trim();
        if street.is_empty() {
            return None;
        }
        let mut parts = vec![street.to_string()];
        for piece in [&self.city, &self.state, &self.zip] {
            if let Some(p) = piece.as_deref() {
                if !p.trim().is_empty() {
                    parts.push(p.trim().to_string());
                }
            }
        }
        Some(parts.join(", "))
    }
}

// --- Conflicts ---

/// One field where the submitted value and an externally found value diverge
/// beyond the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub field: String,
    pub submitted_value: String,
    pub found_value: String,
    /// 1 - similarity: how confident we are that these really differ.
    pub confidence: f64,
    /// Which external source produced the conflicting value.
    pub source: String,
}
