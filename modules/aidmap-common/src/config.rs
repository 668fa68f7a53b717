use std::env;

/// Application configuration loaded from environment variables.
/// Secrets and env-specific endpoints only; pipeline tunables live in
/// `VerifierConfig` and take their defaults from here.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // AI
    pub anthropic_api_key: String,
    pub anthropic_model: String,

    // Browser (reachability probes)
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // Geocoding
    pub geocoder_url: String,

    // Web search (URL auto-fix agent). Optional: without it the auto-fixer
    // is disabled and dead URLs go straight to a hard fail.
    pub serper_api_key: Option<String>,

    // Cross-reference sources. Each is optional; a missing value skips
    // that source.
    pub community_index_url: Option<String>,
    pub places_api_key: Option<String>,

    // Decision thresholds (see DecisionThresholds for defaults)
    pub approve_threshold: Option<f64>,
    pub reject_threshold: Option<f64>,
}

impl Config {
    /// Load verifier configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn verifier_from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            browserless_url: required_env("BROWSERLESS_URL"),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            serper_api_key: env::var("SERPER_API_KEY").ok(),
            community_index_url: env::var("COMMUNITY_INDEX_URL").ok(),
            places_api_key: env::var("PLACES_API_KEY").ok(),
            approve_threshold: parse_env("DECISION_APPROVE_THRESHOLD"),
            reject_threshold: parse_env("DECISION_REJECT_THRESHOLD"),
        }
    }

    /// Log which keys are present without leaking their values.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview(&self.anthropic_api_key));
        tracing::info!("  ANTHROPIC_MODEL: {}", self.anthropic_model);
        tracing::info!("  BROWSERLESS_URL: {}", self.browserless_url);
        tracing::info!("  GEOCODER_URL: {}", self.geocoder_url);
        tracing::info!("  SERPER_API_KEY: {}", preview_opt(&self.serper_api_key));
        tracing::info!(
            "  COMMUNITY_INDEX_URL: {}",
            self.community_index_url.as_deref().unwrap_or("<not set>")
        );
        tracing::info!("  PLACES_API_KEY: {}", preview_opt(&self.places_api_key));
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parse_env(key: &str) -> Option<f64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
