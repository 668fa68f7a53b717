use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use aidmap_common::{Config, Suggestion, VerificationType};
use aidmap_events::PgEventStore;
use aidmap_verify::analyst::ClaudeAnalyst;
use aidmap_verify::checks::content::HttpFetcher;
use aidmap_verify::checks::cross_reference::{
    CommunityIndexClient, DirectoryIndex, PlacesSearchClient,
};
use aidmap_verify::checks::reachability::BrowserlessProber;
use aidmap_verify::conflicts::DEFAULT_SIMILARITY_THRESHOLD;
use aidmap_verify::intake::{validate_batch, BatchSubmission};
use aidmap_verify::search::{SerperSearcher, WebSearcher};
use aidmap_verify::store::PgVerificationStore;
use aidmap_verify::{DecisionThresholds, Verifier, VerifierConfig, VerifierDeps};
use geocode_client::GeocodeClient;

/// Run a batch of suggestions through the verification pipeline.
#[derive(Parser)]
#[command(name = "aidmap-verify")]
struct Cli {
    /// JSON file containing an array of suggestions.
    file: PathBuf,

    /// Who is submitting this batch.
    #[arg(long, default_value = "cli")]
    submitted_by: String,

    /// Why this pass is running: initial, periodic, or reported.
    #[arg(long, default_value = "initial")]
    verification_type: VerificationType,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aidmap=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("aidmap verifier starting...");

    let config = Config::verifier_from_env();
    config.log_redacted();

    let raw = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let suggestions: Vec<Suggestion> =
        serde_json::from_str(&raw).context("suggestions file is not valid JSON")?;

    let batch = BatchSubmission {
        submitted_by: cli.submitted_by,
        notes: None,
        suggestions,
    };

    let errors = validate_batch(&batch);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!(
                "intake error at {}: {} — {}",
                e.index.map_or("batch".to_string(), |i| format!("#{i}")),
                e.field,
                e.message
            );
        }
        anyhow::bail!("{} intake error(s), nothing verified", errors.len());
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let events = PgEventStore::new(pool.clone());
    events.migrate().await?;

    let store = PgVerificationStore::new(pool.clone());
    store.migrate().await?;

    let searcher: Option<Arc<dyn WebSearcher>> = match &config.serper_api_key {
        Some(key) => Some(Arc::new(SerperSearcher::new(key))),
        None => {
            warn!("SERPER_API_KEY not set, URL auto-fix disabled");
            None
        }
    };

    let mut indices: Vec<Arc<dyn DirectoryIndex>> = Vec::new();
    if let Some(url) = &config.community_index_url {
        indices.push(Arc::new(CommunityIndexClient::new(url)));
    }
    if let Some(key) = &config.places_api_key {
        indices.push(Arc::new(PlacesSearchClient::new(key)));
    }
    if indices.is_empty() {
        warn!("no cross-reference sources configured");
    }

    let claude = Claude::new(&config.anthropic_api_key, &config.anthropic_model);

    let deps = VerifierDeps {
        prober: Arc::new(BrowserlessProber::new(
            &config.browserless_url,
            config.browserless_token.as_deref(),
        )),
        geocoder: Arc::new(GeocodeClient::new(&config.geocoder_url)),
        fetcher: Arc::new(HttpFetcher::new()),
        analyst: Arc::new(ClaudeAnalyst::new(claude, searcher)),
        indices,
        sink: Arc::new(events),
        store: Arc::new(store),
    };

    let verifier = Verifier::new(
        deps,
        VerifierConfig {
            thresholds: DecisionThresholds::from_config(&config),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            ..VerifierConfig::default()
        },
    );

    let outcome = verifier
        .verify_batch(&batch.suggestions, cli.verification_type)
        .await;

    for resource in &outcome.outcomes {
        info!(
            suggestion_id = %resource.suggestion_id,
            status = %resource.status,
            score = ?resource.score,
            reason = resource.reason.as_deref().unwrap_or(""),
            "Resource outcome"
        );
    }

    println!("{outcome}");

    Ok(())
}
