use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// What one navigation probe observed.
#[derive(Debug, Clone, Copy)]
pub struct ProbeReport {
    pub status_code: Option<u16>,
    pub latency_ms: u64,
}

/// Drives a real browser at a URL. Production is [`BrowserlessProber`];
/// tests inject a counting mock.
#[async_trait]
pub trait UrlProber: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeReport>;
}

/// Evidence produced by the reachability check.
#[derive(Debug, Clone, Serialize)]
pub struct ReachabilityCheck {
    pub pass: bool,
    pub checked_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    /// Set when the URL was repaired by the auto-fixer and re-verified.
    pub fixed_url: Option<String>,
}

impl ReachabilityCheck {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            pass: false,
            checked_at: Utc::now(),
            latency_ms: 0,
            status_code: None,
            error: Some(error.into()),
            fixed_url: None,
        }
    }
}

/// Check whether a claimed website responds with a success-range status.
///
/// Malformed URLs fail fast without touching the prober. Navigation errors
/// of any kind (DNS, refused, timeout) are a failed check, never a fault.
pub async fn check_reachability(prober: &dyn UrlProber, url: &str) -> ReachabilityCheck {
    let parsed = match url::Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            return ReachabilityCheck::failed(format!("invalid URL: {e}"));
        }
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return ReachabilityCheck::failed(format!(
            "only http/https URLs are allowed, got: {}",
            parsed.scheme()
        ));
    }

    match prober.probe(url).await {
        Ok(report) => {
            // 2xx-3xx counts as reachable; 4xx/5xx and missing status do not.
            let pass = report
                .status_code
                .map(|s| (200..400).contains(&s))
                .unwrap_or(false);

            info!(
                url,
                status = ?report.status_code,
                latency_ms = report.latency_ms,
                pass,
                "Reachability probe complete"
            );

            ReachabilityCheck {
                pass,
                checked_at: Utc::now(),
                latency_ms: report.latency_ms,
                status_code: report.status_code,
                error: None,
                fixed_url: None,
            }
        }
        Err(e) => {
            warn!(url, error = %e, "Reachability probe failed");
            ReachabilityCheck::failed(e.to_string())
        }
    }
}

// --- Browserless-backed prober ---

pub struct BrowserlessProber {
    client: browserless_client::BrowserlessClient,
}

impl BrowserlessProber {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            client: browserless_client::BrowserlessClient::new(base_url, token),
        }
    }
}

#[async_trait]
impl UrlProber for BrowserlessProber {
    async fn probe(&self, url: &str) -> Result<ProbeReport> {
        let outcome = self.client.probe(url).await?;
        Ok(ProbeReport {
            status_code: outcome.status,
            latency_ms: outcome.elapsed_ms,
        })
    }
}
