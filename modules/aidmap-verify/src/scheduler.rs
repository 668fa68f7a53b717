//! Re-verification scheduling. Volatile fields force more frequent re-checks.

use chrono::{DateTime, Duration, Utc};

/// Re-check interval in days for a field, keyed by how often that field
/// tends to change in the wild.
pub fn cadence_days(field: &str) -> i64 {
    match field {
        "phone" | "hours" => 30,
        "website" | "email" | "services" => 60,
        "description" | "eligibility" => 90,
        "address" | "city" | "state" | "zip" => 180,
        "name" | "category" => 365,
        _ => 90,
    }
}

/// Default interval when nothing changed since the last pass.
const DEFAULT_CADENCE_DAYS: i64 = 30;

/// Next verification date given which fields changed since the last pass:
/// `now +` the *shortest* cadence among changed fields.
pub fn next_verification_date<S: AsRef<str>>(
    changed_fields: &[S],
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let days = changed_fields
        .iter()
        .map(|f| cadence_days(f.as_ref()))
        .min()
        .unwrap_or(DEFAULT_CADENCE_DAYS);

    now + Duration::days(days)
}
