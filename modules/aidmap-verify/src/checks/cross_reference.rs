use anyhow::{Context, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::conflicts::similarity;

/// A cross-reference match needs at least this name similarity to count as
/// corroboration for scoring.
pub const MIN_MATCH_SCORE: f64 = 0.5;

/// An organization's canonical fields as known by one external source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FoundOrganization {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

/// Best match one source produced for a lookup.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    /// Name similarity between the submitted and found organization.
    pub match_score: f64,
    pub data: FoundOrganization,
}

/// One external directory the pipeline can cross-reference against.
/// `Ok(None)` is a clean no-match; `Err` means the source is unavailable.
#[async_trait]
pub trait DirectoryIndex: Send + Sync {
    fn source(&self) -> &'static str;
    async fn lookup(&self, name: &str, address: Option<&str>) -> Result<Option<IndexMatch>>;
}

/// Per-source result kept as evidence.
#[derive(Debug, Clone, Serialize)]
pub struct SourceResult {
    pub source: String,
    pub found: bool,
    pub match_score: Option<f64>,
    pub data: Option<FoundOrganization>,
}

/// Combined outcome of the cross-reference check.
#[derive(Debug, Clone)]
pub struct CrossReferenceCheck {
    pub pass: bool,
    /// Best match score across sources, when any source matched.
    pub confidence: Option<f64>,
    pub results: Vec<SourceResult>,
}

/// Query every configured index for the organization.
///
/// A source that errors is skipped with a warning; if every source errors the
/// whole check is unavailable (`None`). No-match everywhere is a recorded
/// failure, not an error.
pub async fn cross_reference(
    indices: &[Arc<dyn DirectoryIndex>],
    name: &str,
    address: Option<&str>,
) -> Option<CrossReferenceCheck> {
    if indices.is_empty() {
        return None;
    }

    let mut results = Vec::new();
    let mut errors = 0usize;

    for index in indices {
        match index.lookup(name, address).await {
            Ok(Some(m)) => {
                info!(
                    source = index.source(),
                    match_score = m.match_score,
                    "Cross-reference match"
                );
                results.push(SourceResult {
                    source: index.source().to_string(),
                    found: true,
                    match_score: Some(m.match_score),
                    data: Some(m.data),
                });
            }
            Ok(None) => {
                results.push(SourceResult {
                    source: index.source().to_string(),
                    found: false,
                    match_score: None,
                    data: None,
                });
            }
            Err(e) => {
                warn!(source = index.source(), error = %e, "Cross-reference source unavailable");
                errors += 1;
            }
        }
    }

    if results.is_empty() && errors > 0 {
        return None;
    }

    let best = results
        .iter()
        .filter_map(|r| r.match_score)
        .fold(None::<f64>, |acc, s| Some(acc.map_or(s, |a| a.max(s))));

    Some(CrossReferenceCheck {
        pass: best.map(|s| s >= MIN_MATCH_SCORE).unwrap_or(false),
        confidence: best,
        results,
    })
}

// --- Regional community-resource index ---

/// Open-Referral-style search API exposed by regional resource directories.
pub struct CommunityIndexClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CommunitySearchResponse {
    #[serde(default)]
    results: Vec<CommunityRecord>,
}

#[derive(Debug, Deserialize)]
struct CommunityRecord {
    name: String,
    phone: Option<String>,
    website: Option<String>,
    address: Option<String>,
    email: Option<String>,
}

impl CommunityIndexClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DirectoryIndex for CommunityIndexClient {
    fn source(&self) -> &'static str {
        "community_index"
    }

    async fn lookup(&self, name: &str, address: Option<&str>) -> Result<Option<IndexMatch>> {
        let mut url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(name)
        );
        if let Some(addr) = address {
            url.push_str(&format!("&location={}", urlencoding::encode(addr)));
        }

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("Community index request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Community index returned {}", resp.status());
        }

        let data: CommunitySearchResponse = resp
            .json()
            .await
            .context("Failed to parse community index response")?;

        Ok(best_match(name, data.results.into_iter().map(|r| {
            FoundOrganization {
                name: Some(r.name),
                phone: r.phone,
                website: r.website,
                address: r.address,
                email: r.email,
            }
        })))
    }
}

// --- Mapping provider places search ---

/// Places text search on the mapping provider's API.
pub struct PlacesSearchClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    places: Vec<PlaceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceRecord {
    display_name: Option<PlaceDisplayName>,
    formatted_address: Option<String>,
    national_phone_number: Option<String>,
    website_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceDisplayName {
    text: String,
}

impl PlacesSearchClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl DirectoryIndex for PlacesSearchClient {
    fn source(&self) -> &'static str {
        "places"
    }

    async fn lookup(&self, name: &str, address: Option<&str>) -> Result<Option<IndexMatch>> {
        let text_query = match address {
            Some(addr) => format!("{name}, {addr}"),
            None => name.to_string(),
        };

        let body = serde_json::json!({ "textQuery": text_query, "pageSize": 3 });

        let resp = self
            .client
            .post("https://places.googleapis.com/v1/places:searchText")
            .header("X-Goog-Api-Key", &self.api_key)
            .header(
                "X-Goog-FieldMask",
                "places.displayName,places.formattedAddress,places.nationalPhoneNumber,places.websiteUri",
            )
            .json(&body)
            .send()
            .await
            .context("Places search request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Places search returned {}", resp.status());
        }

        let data: PlacesResponse = resp
            .json()
            .await
            .context("Failed to parse places response")?;

        Ok(best_match(name, data.places.into_iter().map(|p| {
            FoundOrganization {
                name: p.display_name.map(|d| d.text),
                phone: p.national_phone_number,
                website: p.website_uri,
                address: p.formatted_address,
                email: None,
            }
        })))
    }
}

/// Pick the candidate whose name is closest to the submitted one.
fn best_match(
    submitted_name: &str,
    candidates: impl Iterator<Item = FoundOrganization>,
) -> Option<IndexMatch> {
    let submitted = submitted_name.trim().to_lowercase();

    candidates
        .map(|data| {
            let score = data
                .name
                .as_deref()
                .map(|n| similarity(&submitted, &n.trim().to_lowercase()))
                .unwrap_or(0.0);
            IndexMatch {
                match_score: score,
                data,
            }
        })
        .max_by(|a, b| {
            a.match_score
                .partial_cmp(&b.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
