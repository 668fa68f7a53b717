//! Test doubles and fixtures — MOCK → FUNCTION → OUTPUT.
//!
//! Every external seam has a hand-rolled mock here so orchestrator tests run
//! without a browser, a database, or an API key.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ai_client::{Reply, TokenUsage};
use aidmap_common::{Suggestion, SuggestionOrigin};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use geocode_client::GeocodedAddress;
use uuid::Uuid;

use crate::analyst::{Analyst, ContentMatchVerdict};
use crate::checks::cross_reference::{DirectoryIndex, FoundOrganization, IndexMatch};
use crate::checks::geocode::Geocoder;
use crate::checks::reachability::{ProbeReport, UrlProber};
use crate::checks::content::PageFetcher;
use crate::cost::CostEntry;
use crate::store::{LogStore, NewVerificationLog};

/// Token usage every mock LLM reply reports.
pub const MOCK_USAGE: TokenUsage = TokenUsage {
    input_tokens: 1_200,
    output_tokens: 80,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A well-formed suggestion with every checked field populated.
pub fn suggestion_fixture() -> Suggestion {
    Suggestion {
        id: Uuid::new_v4(),
        name: "Oak Park Intake Center".to_string(),
        address: Some("1212 Broadway".to_string()),
        city: Some("Oakland".to_string()),
        state: Some("CA".to_string()),
        zip: Some("94612".to_string()),
        phone: Some("5551234567".to_string()),
        website: Some("https://oakparkintake.org".to_string()),
        email: Some("info@oakparkintake.org".to_string()),
        description: Some("Walk-in intake and referral services.".to_string()),
        category: Some("social services".to_string()),
        services: vec!["intake".to_string(), "referrals".to_string()],
        eligibility: Some("Alameda County residents".to_string()),
        languages: vec!["en".to_string(), "es".to_string()],
        accessibility: vec!["wheelchair".to_string()],
        hours: Some("Mon-Fri 9-5".to_string()),
        lat: None,
        lng: None,
        origin: SuggestionOrigin::AgentDiscovered,
        source_url: Some("https://alamedacounty.example/listings".to_string()),
        created_at: Utc::now(),
    }
}

/// The dead-website scenario: claimed site does not respond.
pub fn dead_site_fixture() -> Suggestion {
    Suggestion {
        name: "Oak PIC".to_string(),
        website: Some("https://dead.example".to_string()),
        email: None,
        ..suggestion_fixture()
    }
}

// ---------------------------------------------------------------------------
// MockProber
// ---------------------------------------------------------------------------

/// Prober that passes only allow-listed URLs (everything else 404s) and
/// counts every navigation.
#[derive(Default)]
pub struct MockProber {
    pass_urls: HashSet<String>,
    calls: AtomicU32,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pass_url(mut self, url: &str) -> Self {
        self.pass_urls.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlProber for MockProber {
    async fn probe(&self, url: &str) -> Result<ProbeReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let status = if self.pass_urls.contains(url) { 200 } else { 404 };
        Ok(ProbeReport {
            status_code: Some(status),
            latency_ms: 12,
        })
    }
}

// ---------------------------------------------------------------------------
// MockGeocoder
// ---------------------------------------------------------------------------

pub enum MockGeocoder {
    Hit(GeocodedAddress),
    Miss,
    Broken,
}

impl MockGeocoder {
    pub fn hit() -> Self {
        MockGeocoder::Hit(GeocodedAddress {
            lat: 37.8044,
            lng: -122.2712,
            display_name: "1212 Broadway, Oakland, CA 94612".to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, _query: &str) -> Result<Option<GeocodedAddress>> {
        match self {
            MockGeocoder::Hit(addr) => Ok(Some(addr.clone())),
            MockGeocoder::Miss => Ok(None),
            MockGeocoder::Broken => Err(anyhow!("geocoder 500")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Serves canned HTML per URL; unknown URLs fail to fetch.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        self.pages.get(url).cloned()
    }
}

// ---------------------------------------------------------------------------
// MockAnalyst
// ---------------------------------------------------------------------------

/// Analyst double. By default it can search, answers "not found" to URL
/// fixes, and has no content verdict configured (the content check becomes
/// unavailable, as with a provider outage).
pub struct MockAnalyst {
    content_verdict: Option<ContentMatchVerdict>,
    url_fix: Option<String>,
    fail: bool,
    searchable: bool,
}

impl MockAnalyst {
    pub fn new() -> Self {
        Self {
            content_verdict: None,
            url_fix: None,
            fail: false,
            searchable: true,
        }
    }

    pub fn with_url_fix(mut self, url: &str) -> Self {
        self.url_fix = Some(url.to_string());
        self
    }

    pub fn with_content_match(mut self, matches: bool, confidence: f64) -> Self {
        self.content_verdict = Some(ContentMatchVerdict {
            matches,
            confidence,
            found: FoundOrganization::default(),
            reasoning: "mock verdict".to_string(),
        });
        self
    }

    pub fn with_content_verdict(mut self, verdict: ContentMatchVerdict) -> Self {
        self.content_verdict = Some(verdict);
        self
    }

    /// Every call errors, as when the provider is down.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn without_search(mut self) -> Self {
        self.searchable = false;
        self
    }
}

impl Default for MockAnalyst {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyst for MockAnalyst {
    async fn judge_content_match(
        &self,
        _suggestion: &Suggestion,
        _page_text: &str,
    ) -> Result<Reply<ContentMatchVerdict>> {
        if self.fail {
            return Err(anyhow!("analyst unavailable"));
        }

        match &self.content_verdict {
            Some(verdict) => Ok(Reply {
                value: verdict.clone(),
                usage: MOCK_USAGE,
            }),
            None => Err(anyhow!("no content verdict configured")),
        }
    }

    async fn find_official_url(
        &self,
        _suggestion: &Suggestion,
        _dead_url: &str,
    ) -> Result<Reply<String>> {
        if self.fail {
            return Err(anyhow!("analyst unavailable"));
        }

        Ok(Reply {
            value: self
                .url_fix
                .clone()
                .unwrap_or_else(|| "not found".to_string()),
            usage: MOCK_USAGE,
        })
    }

    fn can_search(&self) -> bool {
        self.searchable
    }

    fn model(&self) -> &str {
        "claude-haiku-4-5-20251001"
    }

    fn provider(&self) -> &'static str {
        "anthropic"
    }
}

// ---------------------------------------------------------------------------
// MockIndex
// ---------------------------------------------------------------------------

pub struct MockIndex {
    source: &'static str,
    result: Option<IndexMatch>,
    broken: bool,
}

impl MockIndex {
    pub fn matching(source: &'static str, match_score: f64, data: FoundOrganization) -> Self {
        Self {
            source,
            result: Some(IndexMatch { match_score, data }),
            broken: false,
        }
    }

    pub fn empty(source: &'static str) -> Self {
        Self {
            source,
            result: None,
            broken: false,
        }
    }

    pub fn broken(source: &'static str) -> Self {
        Self {
            source,
            result: None,
            broken: true,
        }
    }
}

#[async_trait]
impl DirectoryIndex for MockIndex {
    fn source(&self) -> &'static str {
        self.source
    }

    async fn lookup(&self, _name: &str, _address: Option<&str>) -> Result<Option<IndexMatch>> {
        if self.broken {
            return Err(anyhow!("index unavailable"));
        }
        Ok(self.result.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryLogStore
// ---------------------------------------------------------------------------

/// Captures log writes and ledger rows for assertions.
#[derive(Default)]
pub struct MemoryLogStore {
    logs: Mutex<Vec<NewVerificationLog>>,
    costs: Mutex<Vec<(Uuid, Vec<CostEntry>)>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<NewVerificationLog> {
        self.logs.lock().unwrap().clone()
    }

    pub fn cost_rows(&self) -> Vec<(Uuid, Vec<CostEntry>)> {
        self.costs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn write_log(&self, log: &NewVerificationLog) -> Result<Uuid> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(Uuid::new_v4())
    }

    async fn record_costs(&self, suggestion_id: Uuid, entries: &[CostEntry]) -> Result<()> {
        self.costs
            .lock()
            .unwrap()
            .push((suggestion_id, entries.to_vec()));
        Ok(())
    }
}
